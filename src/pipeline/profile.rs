//! Pipeline profiles.
//!
//! Debug and production resolve to explicit, ordered stage lists at build
//! time instead of runtime conditionals scattered through construction.
//! Reordering entries here breaks documented guarantees (method override
//! must precede the CSRF guard, auth resolution must precede block
//! enforcement), so the lists are written out in full.

/// Named configuration profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Debug,
    Production,
}

/// Identifies one stage of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    RequestLog,
    RenderTimer,
    AssetCompiler,
    StaticFiles,
    AgentProxy,
    ResponseTime,
    SecurityHeaders,
    BodyParser,
    MethodOverride,
    CookieParser,
    Compression,
    Session,
    OauthInit,
    Auth,
    CsrfGuard,
    ViewCache,
    Locals,
    ErrorPage,
    Multipart,
    LoopbackGuard,
    ApiRouter,
    WebRouter,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::RequestLog => "request_log",
            StageKind::RenderTimer => "render_timer",
            StageKind::AssetCompiler => "asset_compiler",
            StageKind::StaticFiles => "static_files",
            StageKind::AgentProxy => "agent_proxy",
            StageKind::ResponseTime => "response_time",
            StageKind::SecurityHeaders => "security_headers",
            StageKind::BodyParser => "body_parser",
            StageKind::MethodOverride => "method_override",
            StageKind::CookieParser => "cookie_parser",
            StageKind::Compression => "compression",
            StageKind::Session => "session",
            StageKind::OauthInit => "oauth_init",
            StageKind::Auth => "auth",
            StageKind::CsrfGuard => "csrf_guard",
            StageKind::ViewCache => "view_cache",
            StageKind::Locals => "locals",
            StageKind::ErrorPage => "error_page",
            StageKind::Multipart => "multipart",
            StageKind::LoopbackGuard => "loopback_guard",
            StageKind::ApiRouter => "api_router",
            StageKind::WebRouter => "web_router",
        }
    }
}

impl Profile {
    /// The ordered stage list this profile resolves to.
    pub fn stages(&self) -> Vec<StageKind> {
        match self {
            Profile::Debug => vec![
                StageKind::RequestLog,
                StageKind::RenderTimer,
                StageKind::AssetCompiler,
                StageKind::StaticFiles,
                StageKind::AgentProxy,
                StageKind::ResponseTime,
                StageKind::SecurityHeaders,
                StageKind::BodyParser,
                StageKind::MethodOverride,
                StageKind::CookieParser,
                StageKind::Compression,
                StageKind::Session,
                StageKind::OauthInit,
                StageKind::Auth,
                StageKind::Locals,
                StageKind::ErrorPage,
                StageKind::Multipart,
                StageKind::LoopbackGuard,
                StageKind::ApiRouter,
                StageKind::WebRouter,
            ],
            Profile::Production => vec![
                StageKind::RequestLog,
                StageKind::StaticFiles,
                StageKind::AgentProxy,
                StageKind::ResponseTime,
                StageKind::SecurityHeaders,
                StageKind::BodyParser,
                StageKind::MethodOverride,
                StageKind::CookieParser,
                StageKind::Compression,
                StageKind::Session,
                StageKind::OauthInit,
                StageKind::Auth,
                StageKind::CsrfGuard,
                StageKind::ViewCache,
                StageKind::Locals,
                StageKind::ErrorPage,
                StageKind::Multipart,
                StageKind::LoopbackGuard,
                StageKind::ApiRouter,
                StageKind::WebRouter,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(profile: Profile, kind: StageKind) -> Option<usize> {
        profile.stages().iter().position(|k| *k == kind)
    }

    #[test]
    fn test_debug_profile_order() {
        let stages = Profile::Debug.stages();
        assert_eq!(stages.first(), Some(&StageKind::RequestLog));
        assert_eq!(stages.last(), Some(&StageKind::WebRouter));
        // Development-only stages are present, production-only ones absent.
        assert!(stages.contains(&StageKind::RenderTimer));
        assert!(stages.contains(&StageKind::AssetCompiler));
        assert!(!stages.contains(&StageKind::CsrfGuard));
        assert!(!stages.contains(&StageKind::ViewCache));
    }

    #[test]
    fn test_production_profile_order() {
        let stages = Profile::Production.stages();
        assert!(!stages.contains(&StageKind::RenderTimer));
        assert!(!stages.contains(&StageKind::AssetCompiler));
        assert!(stages.contains(&StageKind::CsrfGuard));
        assert!(stages.contains(&StageKind::ViewCache));
    }

    #[test]
    fn test_method_override_precedes_csrf_guard() {
        let p = Profile::Production;
        assert!(
            position(p, StageKind::MethodOverride).unwrap()
                < position(p, StageKind::CsrfGuard).unwrap()
        );
    }

    #[test]
    fn test_session_auth_sequencing() {
        for profile in [Profile::Debug, Profile::Production] {
            let session = position(profile, StageKind::Session).unwrap();
            let oauth = position(profile, StageKind::OauthInit).unwrap();
            let auth = position(profile, StageKind::Auth).unwrap();
            assert!(session < oauth && oauth < auth);
        }
    }

    #[test]
    fn test_routers_are_terminal() {
        for profile in [Profile::Debug, Profile::Production] {
            let stages = profile.stages();
            assert_eq!(stages[stages.len() - 2], StageKind::ApiRouter);
            assert_eq!(stages[stages.len() - 1], StageKind::WebRouter);
            let guard = position(profile, StageKind::LoopbackGuard).unwrap();
            assert_eq!(guard, stages.len() - 3);
        }
    }
}
