pub mod content_file;
pub mod content_hash;
pub mod markdown_renderer;
pub mod plain_text;
