//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};
use quill_infra::cache::InMemoryCache;
use quill_infra::database::memory::{
    InMemoryCommentRepository, InMemoryFollowRepository, InMemoryGroupRepository,
    InMemoryPostRepository, InMemoryUserRepository,
};
use quill_infra::database::DatabaseConfig;

#[cfg(feature = "postgres")]
use quill_infra::database::{
    DatabaseConnections, PostgresCommentRepository, PostgresFollowRepository,
    PostgresGroupRepository, PostgresPostRepository, PostgresUserRepository,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub cache: Arc<dyn Cache>,
}

impl AppState {
    /// State backed entirely by in-memory stores. Used when no database
    /// is configured, and by the handler tests.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            posts: Arc::new(InMemoryPostRepository::new()),
            groups: Arc::new(InMemoryGroupRepository::new()),
            comments: Arc::new(InMemoryCommentRepository::new()),
            follows: Arc::new(InMemoryFollowRepository::new()),
            cache: Arc::new(InMemoryCache::new()),
        }
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> Self {
        #[cfg(feature = "postgres")]
        if let Some(config) = db_config {
            match DatabaseConnections::init(config).await {
                Ok(connections) => {
                    let db = connections.main;
                    let state = Self {
                        users: Arc::new(PostgresUserRepository::new(db.clone())),
                        posts: Arc::new(PostgresPostRepository::new(db.clone())),
                        groups: Arc::new(PostgresGroupRepository::new(db.clone())),
                        comments: Arc::new(PostgresCommentRepository::new(db.clone())),
                        follows: Arc::new(PostgresFollowRepository::new(db)),
                        cache: Arc::new(InMemoryCache::new()),
                    };
                    tracing::info!("Application state initialized (postgres)");
                    return state;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                }
            }
        }

        #[cfg(not(feature = "postgres"))]
        let _ = db_config;

        tracing::warn!("No database configured. Running with in-memory stores.");
        Self::in_memory()
    }
}
