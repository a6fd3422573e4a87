pub mod db;
pub mod documents;

pub use db::Database;
pub use documents::{AnalysisSource, DocumentRecord, DocumentStore};
