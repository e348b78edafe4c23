//! Tag service.

use recipedia_common::AppResult;
use recipedia_db::{entities::tag, repositories::TagRepository};

/// Tag service for business logic.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self { tag_repo }
    }

    /// Get a tag by ID.
    pub async fn get(&self, id: &str) -> AppResult<tag::Model> {
        self.tag_repo.get_by_id(id).await
    }

    /// List all tags.
    pub async fn list(&self) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.list_all().await
    }
}
