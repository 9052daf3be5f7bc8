pub mod cli;
pub mod discover;
pub mod error;
pub mod output;
pub mod runner;

pub use tokens_match::Tokenizer;
pub use tokens_template::TokenizerOptions;
