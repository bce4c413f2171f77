//! Per-user session state: the single most recently uploaded image.

use crate::media::SessionImage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds the most recent image per user identity.
///
/// A new upload unconditionally replaces the prior image; entries are never
/// evicted, so the map grows with distinct users for the process lifetime.
/// `get` hands out an `Arc` snapshot, so a racing overwrite never mutates an
/// in-flight request's view of the image.
///
/// The lock is held only for the map operation itself, never across calls
/// into transcription, inference, or synthesis.
#[derive(Clone, Default)]
pub struct SessionStore {
    images: Arc<RwLock<HashMap<i64, Arc<SessionImage>>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an image for a user, replacing any prior one.
    pub async fn put(&self, user_id: i64, image: SessionImage) {
        self.images.write().await.insert(user_id, Arc::new(image));
    }

    /// Get the user's current image, if any. Never mutates.
    pub async fn get(&self, user_id: i64) -> Option<Arc<SessionImage>> {
        self.images.read().await.get(&user_id).cloned()
    }

    /// Number of users with a stored image.
    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }
}
