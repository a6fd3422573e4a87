pub mod keywords;
pub mod pipeline;

pub use keywords::{Keyword, KeywordConfig};
pub use pipeline::{Pipeline, UploadError};
