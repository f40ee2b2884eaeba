use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const MARKDOWN_EXTENSION: &str = "md";

/// A markdown source read from disk.
pub struct ContentFile {
    pub id: String,
    pub file_path: PathBuf,
    pub raw_content: Vec<u8>,
}

impl ContentFile {
    pub fn from_file(file_path: PathBuf) -> io::Result<ContentFile> {
        let raw_content = fs::read(&file_path)?;
        let id = Self::post_id(&file_path).unwrap_or_default();

        Ok(ContentFile {
            id,
            file_path,
            raw_content,
        })
    }

    pub fn is_markdown(file_path: &Path) -> bool {
        matches!(file_path.extension().and_then(|ext| ext.to_str()), Some(MARKDOWN_EXTENSION))
    }

    /// Base file name without the `.md` extension.
    pub fn post_id(file_path: &Path) -> Option<String> {
        let file_name = file_path.file_name()?.to_string_lossy();
        let id = file_name
            .strip_suffix(".md")
            .unwrap_or(file_name.as_ref())
            .to_string();
        Some(id)
    }
}
