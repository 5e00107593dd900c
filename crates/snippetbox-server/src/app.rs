//! Application dependencies.

use std::sync::Arc;

use snippetbox_config::SnippetboxConfig;
use snippetbox_core::Storage;
use snippetbox_session::{SessionConfig, SessionManager};
use snippetbox_templates::TemplateCache;

use crate::error::ServerError;
use crate::static_files::StaticFiles;

/// Everything the handlers share.
///
/// Built once at startup and never mutated afterwards, so it is passed
/// around behind an `Arc`.
pub struct Application {
    /// Storage collaborators
    pub storage: Storage,
    /// Parsed page templates
    pub templates: TemplateCache,
    /// Session cookie codec
    pub sessions: Arc<SessionManager>,
    /// Static asset handler
    pub static_files: StaticFiles,
    /// Whether cookies carry the `Secure` attribute
    pub secure_cookies: bool,
}

impl Application {
    /// Assembles an application from already-built parts.
    pub fn new(
        storage: Storage,
        templates: TemplateCache,
        sessions: Arc<SessionManager>,
        static_files: StaticFiles,
        secure_cookies: bool,
    ) -> Self {
        Self {
            storage,
            templates,
            sessions,
            static_files,
            secure_cookies,
        }
    }

    /// Opens storage, parses templates and builds the session manager.
    ///
    /// Any failure here is fatal: the server must not start with a broken
    /// template set or unreachable storage.
    pub fn from_config(config: &SnippetboxConfig) -> Result<Self, ServerError> {
        let storage = snippetbox_core::connect(&config.storage.dsn, config.storage.password_cost)?;
        let templates = TemplateCache::build(&config.server.template_dir)?;

        let session_config = SessionConfig::new(config.session.secret.clone())
            .with_lifetime(config.session.lifetime())
            .with_cookie_name(config.session.cookie_name.clone())
            .with_secure(config.session.secure);
        let sessions = Arc::new(SessionManager::new(session_config)?);

        let mut static_files = StaticFiles::new(&config.server.static_dir);
        if let Some(value) = &config.server.static_cache_control {
            static_files = static_files.cache_control(value.clone());
        }

        Ok(Self::new(
            storage,
            templates,
            sessions,
            static_files,
            config.session.secure,
        ))
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("pages", &self.templates.pages())
            .field("static_root", &self.static_files.root())
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}
