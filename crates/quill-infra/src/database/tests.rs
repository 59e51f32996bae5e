#[cfg(test)]
mod tests {
    use crate::database::entity::{comment, group, post, user};
    use crate::database::postgres_repo::{
        PostgresCommentRepository, PostgresGroupRepository, PostgresPostRepository,
        PostgresUserRepository,
    };
    use quill_core::domain::Post;
    use quill_core::ports::{BaseRepository, CommentRepository, GroupRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_post_by_id() {
        let post_id = uuid::Uuid::new_v4();
        let author_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post::Model {
                id: post_id,
                author_id,
                text: "First post".to_owned(),
                group_id: None,
                image_url: None,
                published_at: now.into(),
            }]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

        assert!(result.is_some());
        let found = result.unwrap();
        assert_eq!(found.text, "First post");
        assert_eq!(found.id, post_id);
        assert_eq!(found.author_id, author_id);
    }

    #[tokio::test]
    async fn test_find_group_by_slug() {
        let group_id = uuid::Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![group::Model {
                id: group_id,
                title: "Rustaceans".to_owned(),
                slug: "rustaceans".to_owned(),
                description: "Crab talk".to_owned(),
            }]])
            .into_connection();

        let repo = PostgresGroupRepository::new(db);

        let found = repo.find_by_slug("rustaceans").await.unwrap().unwrap();
        assert_eq!(found.id, group_id);
        assert_eq!(found.title, "Rustaceans");
    }

    #[tokio::test]
    async fn test_find_user_by_username() {
        let user_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![user::Model {
                id: user_id,
                username: "ada".to_owned(),
                email: "ada@quill.test".to_owned(),
                password_hash: "hash".to_owned(),
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .into_connection();

        let repo = PostgresUserRepository::new(db);

        let found = repo.find_by_username("ada").await.unwrap().unwrap();
        assert_eq!(found.id, user_id);

        let missing_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<user::Model>::new()])
            .into_connection();
        let repo = PostgresUserRepository::new(missing_db);
        assert!(repo.find_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comments_for_post() {
        let post_id = uuid::Uuid::new_v4();
        let author_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![
                comment::Model {
                    id: uuid::Uuid::new_v4(),
                    post_id,
                    author_id,
                    text: "first".to_owned(),
                    created_at: now.into(),
                },
                comment::Model {
                    id: uuid::Uuid::new_v4(),
                    post_id,
                    author_id,
                    text: "second".to_owned(),
                    created_at: now.into(),
                },
            ]])
            .into_connection();

        let repo = PostgresCommentRepository::new(db);

        let comments = repo.list_for_post(post_id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "first");
    }
}
