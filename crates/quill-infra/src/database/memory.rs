//! In-memory repositories - used when no database is configured, and as
//! the backing store for handler-level tests.
//!
//! Uniqueness rules the schema enforces (username, email, slug, one
//! follow edge per pair) are checked here too so both backends behave
//! alike. Cross-entity cascade is a schema concern and is not mirrored.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Comment, Follow, Group, Post, User};
use quill_core::error::RepoError;
use quill_core::pagination::{POSTS_PER_PAGE, Page, resolve_page};
use quill_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};

/// Sort newest-first and cut the requested page, clamping like the
/// database-backed listings do.
fn paginate_posts(mut posts: Vec<Post>, requested: u64) -> Page<Post> {
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let total = posts.len() as u64;
    let number = resolve_page(requested, total, POSTS_PER_PAGE);
    let start = ((number - 1) * POSTS_PER_PAGE) as usize;
    let items: Vec<Post> = posts
        .into_iter()
        .skip(start)
        .take(POSTS_PER_PAGE as usize)
        .collect();

    Page::new(items, number, total, POSTS_PER_PAGE)
}

/// In-memory user repository.
#[derive(Default)]
pub struct InMemoryUserRepository {
    rows: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut rows = self.rows.write().await;
        let clash = rows.contains_key(&user.id)
            || rows
                .values()
                .any(|u| u.username == user.username || u.email == user.email);
        if clash {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&user.id) {
            return Err(RepoError::NotFound);
        }
        let clash = rows.values().any(|u| {
            u.id != user.id && (u.username == user.username || u.email == user.email)
        });
        if clash {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let rows = self.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }
}

/// In-memory post repository.
#[derive(Default)]
pub struct InMemoryPostRepository {
    rows: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&post.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&post.id) {
            return Err(RepoError::NotFound);
        }
        rows.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn list_recent(&self, page: u64) -> Result<Page<Post>, RepoError> {
        let posts: Vec<Post> = self.rows.read().await.values().cloned().collect();
        Ok(paginate_posts(posts, page))
    }

    async fn list_by_group(&self, group_id: Uuid, page: u64) -> Result<Page<Post>, RepoError> {
        let posts: Vec<Post> = self
            .rows
            .read()
            .await
            .values()
            .filter(|p| p.group_id == Some(group_id))
            .cloned()
            .collect();
        Ok(paginate_posts(posts, page))
    }

    async fn list_by_author(&self, author_id: Uuid, page: u64) -> Result<Page<Post>, RepoError> {
        let posts: Vec<Post> = self
            .rows
            .read()
            .await
            .values()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        Ok(paginate_posts(posts, page))
    }

    async fn list_by_authors(
        &self,
        author_ids: &[Uuid],
        page: u64,
    ) -> Result<Page<Post>, RepoError> {
        if author_ids.is_empty() {
            return Ok(Page::empty());
        }

        let posts: Vec<Post> = self
            .rows
            .read()
            .await
            .values()
            .filter(|p| author_ids.contains(&p.author_id))
            .cloned()
            .collect();
        Ok(paginate_posts(posts, page))
    }

    async fn count_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|p| p.author_id == author_id)
            .count() as u64)
    }
}

/// In-memory group repository.
#[derive(Default)]
pub struct InMemoryGroupRepository {
    rows: RwLock<HashMap<Uuid, Group>>,
}

impl InMemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, group: Group) -> Result<Group, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&group.id) || rows.values().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&group.id) {
            return Err(RepoError::NotFound);
        }
        if rows.values().any(|g| g.id != group.id && g.slug == group.slug) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|g| g.slug == slug)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Group>, RepoError> {
        let mut groups: Vec<Group> = self.rows.read().await.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let rows = self.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }
}

/// In-memory comment repository.
#[derive(Default)]
pub struct InMemoryCommentRepository {
    rows: RwLock<HashMap<Uuid, Comment>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&comment.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&comment.id) {
            return Err(RepoError::NotFound);
        }
        rows.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let mut comments: Vec<Comment> = self
            .rows
            .read()
            .await
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

/// In-memory follow repository.
#[derive(Default)]
pub struct InMemoryFollowRepository {
    rows: RwLock<HashMap<Uuid, Follow>>,
}

impl InMemoryFollowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Follow, Uuid> for InMemoryFollowRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Follow>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut rows = self.rows.write().await;
        let duplicate = rows.contains_key(&follow.id)
            || rows
                .values()
                .any(|f| f.user_id == follow.user_id && f.author_id == follow.author_id);
        if duplicate {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(follow.id, follow.clone());
        Ok(follow)
    }

    async fn update(&self, follow: Follow) -> Result<Follow, RepoError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&follow.id) {
            return Err(RepoError::NotFound);
        }
        rows.insert(follow.id, follow.clone());
        Ok(follow)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl FollowRepository for InMemoryFollowRepository {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn authors_for(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.author_id)
            .collect())
    }

    async fn delete_edge(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        let mut rows = self.rows.write().await;
        let id = rows
            .values()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .map(|f| f.id);

        match id {
            Some(id) => {
                rows.remove(&id);
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn post_at(author_id: Uuid, minutes_ago: i64) -> Post {
        let mut post = Post::new(author_id, format!("post {minutes_ago}"), None, None);
        post.published_at = Utc::now() - Duration::minutes(minutes_ago);
        post
    }

    #[tokio::test]
    async fn test_list_recent_is_newest_first() {
        let repo = InMemoryPostRepository::new();
        let author = Uuid::new_v4();
        for age in [30, 10, 20] {
            repo.save(post_at(author, age)).await.unwrap();
        }

        let page = repo.list_recent(1).await.unwrap();
        let texts: Vec<&str> = page.items.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["post 10", "post 20", "post 30"]);
    }

    #[tokio::test]
    async fn test_sixteen_posts_paginate_ten_then_six() {
        let repo = InMemoryPostRepository::new();
        let author = Uuid::new_v4();
        for age in 0..16 {
            repo.save(post_at(author, age)).await.unwrap();
        }

        let first = repo.list_recent(1).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next());

        let second = repo.list_recent(2).await.unwrap();
        assert_eq!(second.items.len(), 6);
        assert!(!second.has_next());
    }

    #[tokio::test]
    async fn test_page_past_the_end_clamps_to_last() {
        let repo = InMemoryPostRepository::new();
        let author = Uuid::new_v4();
        for age in 0..16 {
            repo.save(post_at(author, age)).await.unwrap();
        }

        let page = repo.list_recent(99).await.unwrap();
        assert_eq!(page.number, 2);
        assert_eq!(page.items.len(), 6);
    }

    #[tokio::test]
    async fn test_feed_contains_only_followed_authors() {
        let repo = InMemoryPostRepository::new();
        let followed = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        repo.save(post_at(followed, 1)).await.unwrap();
        repo.save(post_at(stranger, 2)).await.unwrap();

        let page = repo.list_by_authors(&[followed], 1).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.items.iter().all(|p| p.author_id == followed));

        let empty = repo.list_by_authors(&[], 1).await.unwrap();
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_follow_edge_rejected() {
        let repo = InMemoryFollowRepository::new();
        let user = Uuid::new_v4();
        let author = Uuid::new_v4();

        repo.save(Follow::new(user, author)).await.unwrap();
        let err = repo.save(Follow::new(user, author)).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));

        assert!(repo.exists(user, author).await.unwrap());
        assert_eq!(repo.authors_for(user).await.unwrap(), vec![author]);
    }

    #[tokio::test]
    async fn test_delete_edge_requires_existing_follow() {
        let repo = InMemoryFollowRepository::new();
        let user = Uuid::new_v4();
        let author = Uuid::new_v4();

        let err = repo.delete_edge(user, author).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));

        repo.save(Follow::new(user, author)).await.unwrap();
        repo.delete_edge(user, author).await.unwrap();
        assert!(!repo.exists(user, author).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_requires_existing_post() {
        let repo = InMemoryPostRepository::new();
        let author = Uuid::new_v4();

        let missing = Post::new(author, "ghost".to_string(), None, None);
        let err = repo.update(missing).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));

        let post = repo.save(post_at(author, 1)).await.unwrap();
        let mut edited = post.clone();
        edited.text = "edited".to_string();
        repo.update(edited).await.unwrap();

        let stored = repo.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.text, "edited");
        assert_eq!(stored.published_at, post.published_at);
    }

    #[tokio::test]
    async fn test_username_uniqueness() {
        let repo = InMemoryUserRepository::new();
        let first = User::new("ada".into(), "ada@quill.test".into(), "hash".into());
        repo.save(first).await.unwrap();

        let clash = User::new("ada".into(), "other@quill.test".into(), "hash".into());
        let err = repo.save(clash).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }
}
