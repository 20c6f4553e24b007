pub mod results;

pub use results::{write_importance, write_results, write_results_to, write_roc_points};
