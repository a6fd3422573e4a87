pub mod chat;

pub use chat::{AiResult, AiUnavailable, ChatClient};
