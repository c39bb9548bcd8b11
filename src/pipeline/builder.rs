//! Pipeline construction.
//!
//! # Responsibilities
//! - Resolve the configuration's profile into the ordered stage chain
//! - Load the asset manifest (fatal when missing under mini_assets)
//! - Wire the session store, OAuth machinery and mounted route tables
//!
//! # Design Decisions
//! - Misconfiguration aborts startup: the build returns an error that the
//!   binary propagates as a non-zero exit instead of running degraded
//! - The session store is injectable so tests (and cache-less development)
//!   run against the in-memory backend

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower::util::BoxCloneSyncService;
use tower::Layer;
use tower_http::cors::CorsLayer;

use crate::assets::{AssetError, AssetMap};
use crate::auth::oauth::OauthError;
use crate::auth::GitHubOauth;
use crate::config::bytes::parse_byte_size;
use crate::config::schema::AppConfig;
use crate::pipeline::{ErrorHandler, HttpHandler, Pipeline, StageKind};
use crate::session::{RedisSessionStore, SessionStore, StoreError};
use crate::stages::{
    AgentProxyStage, ApiRouterStage, AssetCompilerStage, AuthStage, BodyParserStage,
    CompressionStage, CookieParserStage, CsrfGuardStage, ErrorPageStage, LocalsStage,
    LoopbackGuardStage, MethodOverrideStage, MultipartStage, OauthInitStage, RenderTimerStage,
    RequestLogStage, ResponseTimeStage, SecurityHeadersStage, SessionStage, StaticFilesStage,
    ViewCacheStage, WebRouterStage,
};

/// Error type for pipeline construction. All variants are fatal.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Assets(#[from] AssetError),

    #[error("session cache unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("oauth setup failed: {0}")]
    Oauth(#[from] OauthError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no {0} route table mounted")]
    MissingMount(&'static str),
}

/// Builds the stage chain from a configuration and the mounted route
/// tables.
pub struct PipelineBuilder {
    config: Arc<AppConfig>,
    web: Option<Router>,
    api: Option<Router>,
    store: Option<Arc<dyn SessionStore>>,
}

impl PipelineBuilder {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            web: None,
            api: None,
            store: None,
        }
    }

    /// Mount the web route table at the root path.
    pub fn with_web_router(mut self, router: Router) -> Self {
        self.web = Some(router);
        self
    }

    /// Mount the API route table at the API path prefix.
    pub fn with_api_router(mut self, router: Router) -> Self {
        self.api = Some(router);
        self
    }

    /// Inject a session store instead of connecting to the configured
    /// cache.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> Result<Pipeline, BuildError> {
        let config = self.config;
        let profile = config.profile();

        let assets = if config.mini_assets {
            AssetMap::load(&config.assets_manifest)?
        } else {
            AssetMap::empty()
        };

        let file_limit = parse_byte_size(&config.file_limit).ok_or_else(|| {
            BuildError::Config(format!("file_limit '{}' is not a byte size", config.file_limit))
        })?;

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(RedisSessionStore::connect(&config.redis.url()).await?),
        };

        let oauth = Arc::new(GitHubOauth::new(&config.github)?);

        let web = BoxCloneSyncService::new(self.web.ok_or(BuildError::MissingMount("web"))?);
        let api = cors_wrapped(self.api.ok_or(BuildError::MissingMount("api"))?);

        let statics = Arc::new(static_locals(&config, &assets));
        let csrf_enabled = profile
            .stages()
            .contains(&StageKind::CsrfGuard);

        let mut stages: Vec<Box<dyn crate::pipeline::Stage>> = Vec::new();
        for kind in profile.stages() {
            let stage: Box<dyn crate::pipeline::Stage> = match kind {
                StageKind::RequestLog => Box::new(RequestLogStage),
                StageKind::RenderTimer => Box::new(RenderTimerStage),
                StageKind::AssetCompiler => {
                    Box::new(AssetCompilerStage::new(config.public_dir.clone()))
                }
                StageKind::StaticFiles => {
                    Box::new(StaticFilesStage::new(config.public_dir.clone()))
                }
                StageKind::AgentProxy => {
                    Box::new(AgentProxyStage::new(config.agent_upstream.clone()))
                }
                StageKind::ResponseTime => Box::new(ResponseTimeStage),
                StageKind::SecurityHeaders => Box::new(SecurityHeadersStage),
                StageKind::BodyParser => Box::new(BodyParserStage),
                StageKind::MethodOverride => Box::new(MethodOverrideStage),
                StageKind::CookieParser => {
                    Box::new(CookieParserStage::new(config.session_secret.clone()))
                }
                StageKind::Compression => Box::new(CompressionStage),
                StageKind::Session => Box::new(SessionStage::new(
                    store.clone(),
                    config.session_cookie_name.clone(),
                    config.session_secret.clone(),
                    Duration::from_secs(config.session_ttl_secs),
                )),
                StageKind::OauthInit => Box::new(OauthInitStage::new(oauth.clone())),
                StageKind::Auth => Box::new(AuthStage::new(config.blocked_users.clone())),
                StageKind::CsrfGuard => Box::new(CsrfGuardStage),
                StageKind::ViewCache => Box::new(ViewCacheStage),
                StageKind::Locals => Box::new(LocalsStage::new(statics.clone(), csrf_enabled)),
                StageKind::ErrorPage => Box::new(ErrorPageStage),
                StageKind::Multipart => Box::new(MultipartStage::new(file_limit)),
                StageKind::LoopbackGuard => {
                    Box::new(LoopbackGuardStage::new(config.hostname()))
                }
                StageKind::ApiRouter => Box::new(ApiRouterStage::new(api.clone())),
                StageKind::WebRouter => Box::new(WebRouterStage::new(web.clone())),
            };
            stages.push(stage);
        }

        Ok(Pipeline::new(stages, ErrorHandler::new(config.debug)))
    }
}

/// Wrap the API route table in permissive cross-origin headers.
fn cors_wrapped(router: Router) -> HttpHandler {
    BoxCloneSyncService::new(CorsLayer::permissive().layer(router))
}

/// Render-context values that never change for the life of the process.
fn static_locals(
    config: &AppConfig,
    assets: &AssetMap,
) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("site_name".to_string(), config.site.name.clone().into());
    map.insert(
        "site_description".to_string(),
        config.site.description.clone().into(),
    );
    map.insert("host".to_string(), config.host.clone().into());
    map.insert("assets".to_string(), assets.to_json());
    map
}
