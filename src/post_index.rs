use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::post::Post;

/// Posts by id. Filled by one load pass, then read by request handlers.
#[derive(Default)]
pub struct PostIndex {
    posts: RwLock<HashMap<String, Arc<Post>>>,
}

impl PostIndex {
    pub fn new() -> Self {
        PostIndex::default()
    }

    /// Replaces any post with the same id and returns it.
    pub fn insert(&self, post: Post) -> Option<Arc<Post>> {
        let post = Arc::new(post);
        self.write().insert(post.id.clone(), post)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Post>> {
        self.read().get(id).cloned()
    }

    /// Snapshot of all posts, newest first.
    pub fn list(&self) -> Vec<Arc<Post>> {
        let mut posts: Vec<Arc<Post>> = self.read().values().cloned().collect();
        posts.sort_by(|a, b| {
            b.metadata.created_at.cmp(&a.metadata.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        posts
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Post>>> {
        self.posts.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Post>>> {
        self.posts.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
