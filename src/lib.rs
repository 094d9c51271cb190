// Public modules for testing
pub mod article;
pub mod config;
pub mod dataset;
pub mod highlight;
pub mod search;
pub mod server;
pub mod templates;
pub mod text;

// Re-export main types
pub use article::Article;
pub use search::{Mode, SearchHit, SearchIndex};
pub use text::{normalize, tokenize};
