use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use spdlog::{debug, info, warn};

use crate::content::content_file::ContentFile;
use crate::content::content_hash::ContentHash;
use crate::content::markdown_renderer::MarkdownRenderer;
use crate::error::LoadError;
use crate::metadata_store::{MetadataStore, Reconciled};
use crate::post::Post;
use crate::post_index::PostIndex;
use crate::post_list::PostList;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Reads every markdown file of a directory into the index, keeping the
/// metadata store in step with the content.
pub struct PostLoader<'a> {
    store: &'a MetadataStore,
    index: &'a PostIndex,
    clock: Clock,
}

impl<'a> PostLoader<'a> {
    pub fn new(store: &'a MetadataStore, index: &'a PostIndex) -> Self {
        PostLoader {
            store,
            index,
            clock: Box::new(Utc::now),
        }
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
        where
            F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Stops at the first error. The index may then hold part of the posts
    /// and must not be served.
    pub fn load(&self, root_dir: &Path) -> Result<LoadSummary, LoadError> {
        info!("Loading posts from {}", root_dir.display());

        let post_list = PostList { root_dir: root_dir.to_path_buf() };
        let mut summary = LoadSummary::default();

        for file_path in Self::unique_post_files(post_list.retrieve_files()?) {
            let content_file = ContentFile::from_file(file_path.clone())
                .map_err(|source| LoadError::Read { path: file_path, source })?;

            let outcome = self.load_post(content_file)?;
            summary.loaded += 1;
            match outcome {
                Reconciled::Created => summary.created += 1,
                Reconciled::Updated => summary.updated += 1,
                Reconciled::Unchanged => summary.unchanged += 1,
            }
        }

        info!("Loaded {} posts ({} new, {} updated, {} unchanged)",
              summary.loaded, summary.created, summary.updated, summary.unchanged);
        Ok(summary)
    }

    /// One file per post id. A later file in walk order replaces an earlier
    /// one, so only the surviving file is reconciled against the store.
    fn unique_post_files(files: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<PathBuf> = vec![];

        for file_path in files {
            let id = ContentFile::post_id(&file_path).unwrap_or_default();
            match slots.get(&id) {
                Some(&slot) => {
                    warn!("Post id {} is used by more than one file, keeping {} over {}",
                          id, file_path.display(), unique[slot].display());
                    unique[slot] = file_path;
                }
                None => {
                    slots.insert(id, unique.len());
                    unique.push(file_path);
                }
            }
        }
        unique
    }

    fn load_post(&self, content_file: ContentFile) -> Result<Reconciled, LoadError> {
        let ContentFile { id, file_path, raw_content } = content_file;

        let rendered = MarkdownRenderer::render(&raw_content);
        let hash = ContentHash::of(&raw_content);
        let (metadata, outcome) = self.store.reconcile(&id, hash, (self.clock)())?;
        debug!("Post {} from {}: {:?}", id, file_path.display(), outcome);

        let post = Post {
            id,
            markdown: raw_content,
            plain_text: rendered.plain_text,
            html: rendered.html,
            metadata,
        };

        self.index.insert(post);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use chrono::TimeZone;
    use tempfile::TempDir;

    use crate::error::StoreError;
    use crate::metadata_store::DEFAULT_LOCK_TIMEOUT;

    use super::*;

    struct Blog {
        dir: TempDir,
    }

    impl Blog {
        fn new() -> Blog {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("posts")).unwrap();
            Blog { dir }
        }

        fn posts_dir(&self) -> PathBuf {
            self.dir.path().join("posts")
        }

        fn write(&self, name: &str, content: &str) {
            let path = self.posts_dir().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }

        fn store(&self) -> MetadataStore {
            MetadataStore::open(&self.dir.path().join("data").join("blog.redb"), DEFAULT_LOCK_TIMEOUT).unwrap()
        }

        // One process run: fresh index, store reopened, clock at `minute`.
        fn load(&self, minute: i64) -> (PostIndex, LoadSummary) {
            let store = self.store();
            let index = PostIndex::new();
            let summary = PostLoader::new(&store, &index)
                .with_clock(move || at(minute))
                .load(&self.posts_dir())
                .unwrap();
            (index, summary)
        }
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(minute)
    }

    #[test]
    fn test_load_builds_posts() {
        let blog = Blog::new();
        blog.write("hello-world.md", "# Hello World\n\nThis is the body.\n\nMore text.");
        blog.write("notes.txt", "ignored");

        let (index, summary) = blog.load(0);
        assert_eq!(summary, LoadSummary { loaded: 1, created: 1, updated: 0, unchanged: 0 });

        let post = index.get("hello-world").unwrap();
        assert_eq!(post.plain_text, "This is the body.\n\nMore text.\n\n");
        assert!(post.html.starts_with("<h1>Hello World</h1>"));
        assert_eq!(post.markdown, b"# Hello World\n\nThis is the body.\n\nMore text.");
        assert_eq!(post.metadata.hash, ContentHash::of(&post.markdown));
        assert_eq!(post.metadata.created_at, at(0));
        assert_eq!(post.metadata.updated_at, at(0));
    }

    #[test]
    fn test_reload_unchanged_is_idempotent() {
        let blog = Blog::new();
        blog.write("stable.md", "Nothing changes here.");

        let (first, _) = blog.load(0);
        let (second, summary) = blog.load(30);

        assert_eq!(summary.unchanged, 1);
        assert_eq!(first.get("stable").unwrap().metadata, second.get("stable").unwrap().metadata);
        assert_eq!(second.get("stable").unwrap().metadata.updated_at, at(0));
    }

    #[test]
    fn test_single_byte_change() {
        let blog = Blog::new();
        blog.write("changing.md", "Version one.");
        let (first, _) = blog.load(0);

        blog.write("changing.md", "Version one!");
        let (second, summary) = blog.load(45);

        let before = &first.get("changing").unwrap().metadata;
        let after = &second.get("changing").unwrap().metadata;
        assert_eq!(summary.updated, 1);
        assert_ne!(before.hash, after.hash);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.updated_at, at(45));
        assert!(after.created_at <= after.updated_at);
    }

    #[test]
    fn test_touch_without_change_keeps_updated_at() {
        let blog = Blog::new();
        blog.write("touched.md", "Same bytes.");
        blog.load(0);

        // Rewriting identical bytes bumps the mtime only
        blog.write("touched.md", "Same bytes.");
        let (index, _) = blog.load(10);
        assert_eq!(index.get("touched").unwrap().metadata.updated_at, at(0));
    }

    #[test]
    fn test_created_never_after_updated() {
        let blog = Blog::new();
        blog.write("a.md", "A.");
        blog.write("nested/b.md", "B.");

        for (minute, content) in [(0, "A."), (5, "A changed."), (9, "A changed again.")] {
            blog.write("a.md", content);
            let (index, _) = blog.load(minute);
            for post in index.list() {
                assert!(post.metadata.created_at <= post.metadata.updated_at);
            }
        }
    }

    #[test]
    fn test_list_is_newest_first() {
        let blog = Blog::new();
        blog.write("old.md", "Old post.");
        blog.load(0);
        blog.write("new.md", "New post.");
        let (index, _) = blog.load(60);

        let ids: Vec<String> = index.list().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, ["new", "old"]);
    }

    #[test]
    fn test_same_id_last_file_wins() {
        let blog = Blog::new();
        blog.write("a/post.md", "From directory a.");
        blog.write("b/post.md", "From directory b.");

        let (index, summary) = blog.load(0);
        assert_eq!(summary, LoadSummary { loaded: 1, created: 1, updated: 0, unchanged: 0 });
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("post").unwrap().plain_text, "From directory b.\n\n");

        // The shadowed file must not flip the stored hash back and forth
        let (index, summary) = blog.load(30);
        assert_eq!(summary, LoadSummary { loaded: 1, created: 0, updated: 0, unchanged: 1 });
        let metadata = &index.get("post").unwrap().metadata;
        assert_eq!(metadata.hash, ContentHash::of(b"From directory b."));
        assert_eq!(metadata.updated_at, at(0));
    }

    #[test]
    fn test_unique_post_files_keeps_walk_order() {
        let files = vec![
            PathBuf::from("posts/a/post.md"),
            PathBuf::from("posts/a/zeta.md"),
            PathBuf::from("posts/b/post.md"),
        ];
        assert_eq!(PostLoader::unique_post_files(files), [
            PathBuf::from("posts/b/post.md"),
            PathBuf::from("posts/a/zeta.md"),
        ]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_post_aborts() {
        let blog = Blog::new();
        blog.write("a-fine.md", "Fine.");
        std::os::unix::fs::symlink(blog.dir.path().join("missing.md"), blog.posts_dir().join("broken.md")).unwrap();
        let store = blog.store();
        let index = PostIndex::new();

        let res = PostLoader::new(&store, &index).load(&blog.posts_dir());
        assert!(matches!(res, Err(LoadError::Read { ref path, .. }) if path.ends_with("broken.md")));
        assert!(store.get("broken").unwrap().is_none());
    }

    #[test]
    fn test_store_failure_aborts_load() {
        let blog = Blog::new();
        blog.write("a-first.md", "First.");
        blog.write("b-broken.md", "Broken record.");
        blog.write("c-last.md", "Last.");
        {
            let store = blog.store();
            store.put_raw("b-broken", b"{not json").unwrap();
        }

        let store = blog.store();
        let index = PostIndex::new();
        let res = PostLoader::new(&store, &index)
            .with_clock(|| at(0))
            .load(&blog.posts_dir());

        assert!(matches!(res, Err(LoadError::Store(StoreError::Decode { ref id, .. })) if id == "b-broken"));
        // Stopped at the failing post, later files were never reconciled
        assert!(index.get("a-first").is_some());
        assert!(index.get("b-broken").is_none());
        assert!(store.get("c-last").unwrap().is_none());
    }

    #[test]
    fn test_missing_dir_aborts() {
        let blog = Blog::new();
        let store = blog.store();
        let index = PostIndex::new();

        let res = PostLoader::new(&store, &index).load(&blog.dir.path().join("nope"));
        assert!(matches!(res, Err(LoadError::Walk(_))));
    }

    #[test]
    fn test_default_clock_moves_forward() {
        let blog = Blog::new();
        blog.write("live.md", "Live.");
        let store = blog.store();
        let index = PostIndex::new();

        let before = Utc::now();
        PostLoader::new(&store, &index).load(&blog.posts_dir()).unwrap();
        assert!(index.get("live").unwrap().metadata.created_at >= before);
    }

    #[test]
    fn test_clock_called_per_post() {
        let blog = Blog::new();
        blog.write("one.md", "One.");
        blog.write("two.md", "Two.");

        let ticks = Arc::new(AtomicI64::new(0));
        let clock_ticks = ticks.clone();
        let store = blog.store();
        let index = PostIndex::new();
        PostLoader::new(&store, &index)
            .with_clock(move || at(clock_ticks.fetch_add(1, Ordering::SeqCst)))
            .load(&blog.posts_dir())
            .unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        let ids: Vec<String> = index.list().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, ["two", "one"]);
    }
}
