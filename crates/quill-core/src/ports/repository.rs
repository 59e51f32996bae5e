use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Follow, Group, Post, User};
use crate::error::RepoError;
use crate::pagination::Page;

/// Generic repository trait defining standard CRUD operations.
///
/// IDs are generated by the caller, so creation and modification are
/// separate operations rather than a single upsert.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Persist a new entity.
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Update an existing entity.
    /// Returns `RepoError::NotFound` when no row carries its ID.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific lookups.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Find a user by their username (the profile URL identifier).
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Batch lookup used to attach author names to post listings.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Post repository. All listings are newest-first by `published_at`
/// and take a requested 1-based page number that clamps to the valid
/// range.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// One page over every post.
    async fn list_recent(&self, page: u64) -> Result<Page<Post>, RepoError>;

    /// One page over a group's posts.
    async fn list_by_group(&self, group_id: Uuid, page: u64) -> Result<Page<Post>, RepoError>;

    /// One page over an author's posts.
    async fn list_by_author(&self, author_id: Uuid, page: u64) -> Result<Page<Post>, RepoError>;

    /// One page over the posts of the given authors - the follow feed.
    /// An empty author set yields an empty page.
    async fn list_by_authors(&self, author_ids: &[Uuid], page: u64)
    -> Result<Page<Post>, RepoError>;

    /// Total number of posts an author has published.
    async fn count_by_author(&self, author_id: Uuid) -> Result<u64, RepoError>;
}

/// Group repository.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, Uuid> {
    /// Find a group by its unique slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    /// Every group, for the post form's group selector.
    async fn list_all(&self) -> Result<Vec<Group>, RepoError>;

    /// Batch lookup used to attach group titles to post listings.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// A post's comments, oldest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;
}

/// Follow repository - the directed subscription graph.
#[async_trait]
pub trait FollowRepository: BaseRepository<Follow, Uuid> {
    /// Whether `user_id` already follows `author_id`.
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// The ids of every author `user_id` follows.
    async fn authors_for(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError>;

    /// Remove the edge from `user_id` to `author_id`.
    /// Returns `RepoError::NotFound` when no such edge exists.
    async fn delete_edge(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError>;
}
