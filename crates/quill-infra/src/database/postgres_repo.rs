//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DbConn, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use uuid::Uuid;

use quill_core::domain::{Comment, Follow, Group, Post, User};
use quill_core::error::RepoError;
use quill_core::pagination::{POSTS_PER_PAGE, Page, resolve_page};
use quill_core::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::follow::{self, Entity as FollowEntity};
use super::entity::group::{self, Entity as GroupEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::PostgresBaseRepository;

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL group repository.
pub type PostgresGroupRepository = PostgresBaseRepository<GroupEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// PostgreSQL follow repository.
pub type PostgresFollowRepository = PostgresBaseRepository<FollowEntity>;

/// Run a post query newest-first through the paginator, clamping the
/// requested page to the valid range the way the listings promise.
async fn page_of_posts(
    select: Select<PostEntity>,
    db: &DbConn,
    requested: u64,
) -> Result<Page<Post>, RepoError> {
    let paginator = select
        .order_by_desc(post::Column::PublishedAt)
        .paginate(db, POSTS_PER_PAGE);

    let total = paginator
        .num_items()
        .await
        .map_err(|e| RepoError::Query(e.to_string()))?;
    let number = resolve_page(requested, total, POSTS_PER_PAGE);

    // fetch_page is 0-based
    let models = paginator
        .fetch_page(number - 1)
        .await
        .map_err(|e| RepoError::Query(e.to_string()))?;

    Ok(Page::new(
        models.into_iter().map(Into::into).collect(),
        number,
        total,
        POSTS_PER_PAGE,
    ))
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn list_recent(&self, page: u64) -> Result<Page<Post>, RepoError> {
        page_of_posts(PostEntity::find(), &self.db, page).await
    }

    async fn list_by_group(&self, group_id: Uuid, page: u64) -> Result<Page<Post>, RepoError> {
        let select = PostEntity::find().filter(post::Column::GroupId.eq(group_id));
        page_of_posts(select, &self.db, page).await
    }

    async fn list_by_author(&self, author_id: Uuid, page: u64) -> Result<Page<Post>, RepoError> {
        let select = PostEntity::find().filter(post::Column::AuthorId.eq(author_id));
        page_of_posts(select, &self.db, page).await
    }

    async fn list_by_authors(
        &self,
        author_ids: &[Uuid],
        page: u64,
    ) -> Result<Page<Post>, RepoError> {
        if author_ids.is_empty() {
            return Ok(Page::empty());
        }

        let select =
            PostEntity::find().filter(post::Column::AuthorId.is_in(author_ids.to_vec()));
        page_of_posts(select, &self.db, page).await
    }

    async fn count_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let result = GroupEntity::find()
            .filter(group::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<Group>, RepoError> {
        let result = GroupEntity::find()
            .order_by_asc(group::Column::Title)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = GroupEntity::find()
            .filter(group::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let count = FollowEntity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(count > 0)
    }

    async fn authors_for(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let edges: Vec<Follow> = FollowEntity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(edges.into_iter().map(|f| f.author_id).collect())
    }

    async fn delete_edge(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        let result = FollowEntity::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
