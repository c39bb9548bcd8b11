//! Stage implementations.
//!
//! Each submodule implements one or two closely related stages of the
//! chain. The fixed total order lives in `pipeline::profile`, not here.

pub mod auth;
pub mod body;
pub mod compress;
pub mod cookies;
pub mod csrf;
pub mod guard;
pub mod headers;
pub mod log;
pub mod proxy;
pub mod render;
pub mod routers;
pub mod session;
pub mod statics;

pub use auth::{AuthStage, OauthInitStage, BLOCK_MESSAGE};
pub use body::{BodyParserStage, MethodOverrideStage, MultipartStage, BODY_LIMIT};
pub use compress::CompressionStage;
pub use cookies::CookieParserStage;
pub use csrf::CsrfGuardStage;
pub use guard::LoopbackGuardStage;
pub use headers::{ResponseTimeStage, SecurityHeadersStage};
pub use log::{RequestLogStage, RenderTimerStage};
pub use proxy::AgentProxyStage;
pub use render::{ErrorPageStage, LocalsStage, ViewCacheStage};
pub use routers::{ApiRouterStage, WebRouterStage};
pub use session::SessionStage;
pub use statics::{AssetCompilerStage, StaticFilesStage};
