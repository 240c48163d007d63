use std::sync::Arc;

use anyhow::Result;
use database_layer::DatabasePool;

use crate::auth::db::UserRepository;
use crate::auth::identity::IdentityBridge;
use crate::auth::oauth::OAuthLoginClient;
use crate::auth::refresh::RefreshService;
use crate::auth::tokens::AccessTokenCodec;
use crate::config::{AppConfig, HandoffBacking};
use crate::storage::{HandoffStore, MemoryHandoffStore, PgHandoffStore};

/// Main Bookhive server state
#[derive(Clone)]
pub struct BookhiveServer {
    /// Server configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db_pool: DatabasePool,
    /// Access token codec shared with the bearer gate
    pub codec: Arc<AccessTokenCodec>,
    /// Refresh session store
    pub refresh: RefreshService,
    /// Identity federation bridge
    pub identity: IdentityBridge,
    /// User repository
    pub users: UserRepository,
    /// External sign-in client
    pub oauth: Arc<OAuthLoginClient>,
    /// Handoff store for async result parking
    pub handoff: Arc<dyn HandoffStore>,
    /// Shared HTTP client
    pub http: reqwest::Client,
}

impl BookhiveServer {
    /// Create a new server instance, connecting the database pool
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db_pool = DatabasePool::new(&config.database_url).await?;
        Self::with_pool(config, db_pool)
    }

    /// Create a server instance over an existing pool (useful for tests)
    pub fn with_pool(config: AppConfig, db_pool: DatabasePool) -> Result<Self> {
        let codec = Arc::new(AccessTokenCodec::new(
            &config.auth.jwt_secret,
            config.auth.access_ttl_seconds,
        ));
        let refresh = RefreshService::new(db_pool.clone(), config.auth.refresh_ttl_days);
        let identity = IdentityBridge::new(db_pool.clone());
        let users = UserRepository::new(db_pool.clone());

        let http = reqwest::Client::new();
        let oauth = Arc::new(OAuthLoginClient::new(&config.oauth, http.clone())?);

        let handoff: Arc<dyn HandoffStore> = match config.handoff_store {
            HandoffBacking::Memory => Arc::new(MemoryHandoffStore::new()),
            HandoffBacking::Postgres => Arc::new(PgHandoffStore::new(db_pool.clone())),
        };

        Ok(Self {
            config,
            db_pool,
            codec,
            refresh,
            identity,
            users,
            oauth,
            handoff,
            http,
        })
    }
}

impl std::fmt::Debug for BookhiveServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookhiveServer")
            .field("handoff_store", &self.config.handoff_store)
            .field("keepalive", &self.config.keepalive.is_some())
            .finish()
    }
}
