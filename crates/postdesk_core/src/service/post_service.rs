//! Post use-case service.
//!
//! # Responsibility
//! - Check that a post's customer exists before any write.
//! - Normalize posts on write: body truncation and category derivation.
//! - Persist single posts and validated batches through `RepositoryService<Post>`.
//!
//! # Invariants
//! - Persisted bodies are at most 100 characters.
//! - A batch is validated completely before the first insert; it is written
//!   in one transaction or not at all.

use crate::error::ErrorKind;
use crate::model::customer::{Customer, CustomerId};
use crate::model::post::{Post, PostId};
use crate::repo::entity_store::UpdateOutcome;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::filter::Filter;
use crate::service::repository_service::RepositoryService;
use log::info;
use rusqlite::Connection;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Bodies longer than this are candidates for truncation.
const BODY_TRUNCATE_MIN_CHARS: usize = 20;
/// Characters kept from a truncated body before the ellipsis.
const BODY_KEEP_CHARS: usize = 97;
const BODY_ELLIPSIS: &str = "...";

/// Service error for post use-cases.
#[derive(Debug)]
pub enum PostServiceError {
    /// Referenced customer does not exist.
    CustomerNotFound(CustomerId),
    /// Batch input contained no posts.
    EmptyBatch,
    /// Target post does not exist.
    PostNotFound(PostId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl PostServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CustomerNotFound(_) | Self::EmptyBatch => ErrorKind::Validation,
            Self::PostNotFound(_) => ErrorKind::NotFound,
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for PostServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CustomerNotFound(id) => write!(f, "customer does not exist: {id}"),
            Self::EmptyBatch => write!(f, "post batch must not be empty"),
            Self::PostNotFound(id) => write!(f, "post not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PostServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PostServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "post", id } => Self::PostNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Post service facade over the generic repository services.
pub struct PostService<'conn> {
    posts: RepositoryService<'conn, Post>,
    customers: RepositoryService<'conn, Customer>,
}

impl<'conn> PostService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            posts: RepositoryService::new(conn),
            customers: RepositoryService::new(conn),
        }
    }

    /// Validates, normalizes and persists one post.
    ///
    /// Returns the stored post with its assigned id.
    pub fn add_post(&self, post: Post) -> Result<Post, PostServiceError> {
        self.ensure_customer_exists(post.customer_id)?;
        let created = self.posts.create(normalize_post(post))?;
        info!(
            "event=post_add module=service status=ok post_id={} customer_id={}",
            created.post_id, created.customer_id
        );
        Ok(created)
    }

    /// Validates and normalizes every post, then inserts the batch atomically.
    ///
    /// # Errors
    /// - `EmptyBatch` when `posts` is empty.
    /// - `CustomerNotFound` for the first post whose customer is missing;
    ///   nothing is written in that case.
    pub fn create_multiple_posts(&self, posts: Vec<Post>) -> Result<Vec<Post>, PostServiceError> {
        if posts.is_empty() {
            return Err(PostServiceError::EmptyBatch);
        }

        let mut known_customers = HashSet::new();
        let mut normalized = Vec::with_capacity(posts.len());
        for post in posts {
            if known_customers.insert(post.customer_id) {
                self.ensure_customer_exists(post.customer_id)?;
            }
            normalized.push(normalize_post(post));
        }

        let created = self.posts.add_many(normalized)?;
        info!(
            "event=post_add_many module=service status=ok count={}",
            created.len()
        );
        Ok(created)
    }

    /// Replaces a stored post, applying the same rules as `add_post`.
    pub fn update_post(
        &self,
        post_id: PostId,
        edited: Post,
    ) -> Result<UpdateOutcome<Post>, PostServiceError> {
        self.ensure_customer_exists(edited.customer_id)?;
        let outcome = self.posts.update(post_id, &normalize_post(edited))?;
        Ok(outcome)
    }

    /// Deletes one post by id and returns it.
    pub fn delete_post(&self, post_id: PostId) -> Result<Post, PostServiceError> {
        let post = self
            .find_post(post_id)?
            .ok_or(PostServiceError::PostNotFound(post_id))?;
        Ok(self.posts.delete(post)?)
    }

    pub fn find_post(&self, post_id: PostId) -> RepoResult<Option<Post>> {
        if post_id <= 0 {
            return Ok(None);
        }
        self.posts.find_by_id(post_id)
    }

    pub fn list_posts(&self) -> RepoResult<Vec<Post>> {
        self.posts.get_all().fetch()
    }

    /// Posts owned by one customer, ordered by id.
    pub fn posts_for_customer(&self, customer_id: CustomerId) -> RepoResult<Vec<Post>> {
        self.posts
            .get_list_by_where(&Filter::eq("customer_id", customer_id))
    }

    fn ensure_customer_exists(&self, customer_id: CustomerId) -> Result<(), PostServiceError> {
        let filter = Filter::eq("customer_id", customer_id);
        match self.customers.get_by_where(&filter)? {
            Some(_) => Ok(()),
            None => Err(PostServiceError::CustomerNotFound(customer_id)),
        }
    }
}

/// Applies body truncation and category derivation.
pub fn normalize_post(mut post: Post) -> Post {
    post.body = truncate_body(&post.body);
    if let Some(category) = category_for_type(post.post_type) {
        post.category = Some(category.to_string());
    }
    post
}

/// Truncates bodies longer than 97 characters to 97 characters plus `...`.
///
/// Bodies of 20 characters or fewer are never touched; between 21 and 97
/// characters they are kept as is.
pub fn truncate_body(body: &str) -> String {
    let length = body.chars().count();
    if length > BODY_TRUNCATE_MIN_CHARS && length > BODY_KEEP_CHARS {
        let mut truncated: String = body.chars().take(BODY_KEEP_CHARS).collect();
        truncated.push_str(BODY_ELLIPSIS);
        return truncated;
    }
    body.to_string()
}

/// Category derived from a post type code, if the code is known.
pub fn category_for_type(post_type: i32) -> Option<&'static str> {
    match post_type {
        1 => Some("Entertainment"),
        2 => Some("Politics"),
        3 => Some("Sports"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{category_for_type, normalize_post, truncate_body};
    use crate::model::post::Post;

    fn body_of(length: usize) -> String {
        "a".repeat(length)
    }

    #[test]
    fn truncation_boundaries() {
        assert_eq!(truncate_body(&body_of(20)), body_of(20));
        assert_eq!(truncate_body(&body_of(21)), body_of(21));
        assert_eq!(truncate_body(&body_of(97)), body_of(97));

        let truncated = truncate_body(&body_of(98));
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.starts_with(&body_of(97)));
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let body = "é".repeat(120);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.starts_with(&"é".repeat(97)));
    }

    #[test]
    fn known_type_codes_map_to_categories() {
        assert_eq!(category_for_type(1), Some("Entertainment"));
        assert_eq!(category_for_type(2), Some("Politics"));
        assert_eq!(category_for_type(3), Some("Sports"));
        assert_eq!(category_for_type(99), None);
    }

    #[test]
    fn unknown_type_keeps_caller_category() {
        let post = normalize_post(Post::new(1, "t", "b", 99).with_category("X"));
        assert_eq!(post.category.as_deref(), Some("X"));

        let post = normalize_post(Post::new(1, "t", "b", 99));
        assert_eq!(post.category, None);
    }

    #[test]
    fn known_type_overrides_caller_category() {
        let post = normalize_post(Post::new(1, "t", "b", 3).with_category("X"));
        assert_eq!(post.category.as_deref(), Some("Sports"));
    }
}
