use std::fs;
use std::path::PathBuf;

use walkdir::{DirEntry, WalkDir};

use crate::content::content_file::ContentFile;
use crate::error::LoadError;

pub struct PostList {
    pub root_dir: PathBuf,
}

impl PostList {
    /// Every markdown file below `root_dir`, in a stable order: entries of a
    /// directory are sorted by name and directories are walked depth first.
    pub fn retrieve_files(&self) -> Result<Vec<PathBuf>, LoadError> {
        let mut posts = vec![];
        for entry in WalkDir::new(&self.root_dir).sort_by_file_name() {
            let entry = entry?;
            if ContentFile::is_markdown(entry.path()) && Self::is_post_file(&entry) {
                posts.push(entry.into_path());
            }
        }
        Ok(posts)
    }

    // A dangling link is kept so reading it reports the broken path.
    fn is_post_file(entry: &DirEntry) -> bool {
        if entry.path_is_symlink() {
            return fs::metadata(entry.path()).map_or(true, |target| target.is_file());
        }
        entry.file_type().is_file()
    }
}
