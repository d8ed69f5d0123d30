pub mod classification;
pub mod error;
pub mod matching;
pub mod models;
pub mod reconcile;
pub mod store;
pub mod utils;
