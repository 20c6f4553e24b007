//! Seeded train/test and k-fold partitioning.
//!
//! Every draw goes through `StdRng::seed_from_u64`, so the same
//! `(dataset, size, seed)` always yields the same row assignment.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data_handling::Dataset;
use crate::error::{EvalError, Result};

/// Disjoint train/test partition of one dataset.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
    pub seed: u64,
    pub test_size: usize,
}

/// Draw `test_size` records uniformly without replacement as the test set;
/// the remaining records, in their original order, form the training set.
pub fn train_test_split(dataset: &Dataset, test_size: usize, seed: u64) -> Result<Split> {
    let n = dataset.len();
    if test_size == 0 {
        return Err(EvalError::InvalidParameter(
            "test_size must be at least 1".to_string(),
        ));
    }
    if test_size >= n {
        return Err(EvalError::InsufficientData {
            requested: test_size,
            available: n,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut test_idx = rand::seq::index::sample(&mut rng, n, test_size).into_vec();
    test_idx.sort_unstable();

    let mut in_test = vec![false; n];
    for &i in &test_idx {
        in_test[i] = true;
    }
    let train_idx: Vec<usize> = (0..n).filter(|&i| !in_test[i]).collect();

    log::trace!(
        "Split seed={} -> {} train / {} test records",
        seed,
        train_idx.len(),
        test_idx.len()
    );

    Ok(Split {
        train: dataset.select_rows(&train_idx)?,
        test: dataset.select_rows(&test_idx)?,
        seed,
        test_size,
    })
}

/// Partition `0..n_samples` into `k_folds` disjoint folds after a seeded
/// shuffle. Fold sizes differ by at most one; the first `n % k` folds hold
/// the extra record.
pub fn kfold_indices(n_samples: usize, k_folds: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k_folds < 2 {
        return Err(EvalError::InvalidParameter(format!(
            "k_folds must be at least 2, got {}",
            k_folds
        )));
    }
    if k_folds > n_samples {
        return Err(EvalError::InsufficientData {
            requested: k_folds,
            available: n_samples,
        });
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let fold_size = n_samples / k_folds;
    let remainder = n_samples % k_folds;

    let mut folds = Vec::with_capacity(k_folds);
    let mut start = 0;
    for i in 0..k_folds {
        let len = if i < remainder { fold_size + 1 } else { fold_size };
        folds.push(indices[start..start + len].to_vec());
        start += len;
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kfold_sizes_differ_by_at_most_one() {
        let folds = kfold_indices(23, 5, 7).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.len()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
        let mut all: Vec<usize> = folds.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn kfold_rejects_single_fold() {
        assert!(kfold_indices(10, 1, 0).is_err());
        assert!(kfold_indices(3, 4, 0).is_err());
    }
}
