pub mod config;
pub mod content;
pub mod error;
pub mod logger;
pub mod metadata_store;
pub mod post;
pub mod post_index;
pub mod post_list;
pub mod post_processor;
pub mod server;
mod test_data;
