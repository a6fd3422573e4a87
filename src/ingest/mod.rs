pub mod pdf;

pub use pdf::{ExtractionError, extract};
