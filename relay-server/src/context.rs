//! Server context: procedure tables, static content, store handle, and
//! the authorization predicate.

use crate::config::Config;
use crate::error::ServerError;
use crate::logging;
use crate::ratelimit::RateLimiter;
use crate::registry::Procedure;
use crate::request::RequestContext;
use crate::rest::RestRoute;
use relay_store::Store;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Pluggable authorization predicate. Returning `false` fails the
/// request with `authentication_failed`.
pub type AuthorizationFn = Arc<dyn Fn(&mut RequestContext) -> bool + Send + Sync>;

/// Everything the dispatcher needs to serve requests. Procedure and
/// route tables are populated during startup and read-only while
/// serving.
pub struct Context {
    pub(crate) procedures: HashMap<String, Procedure>,
    pub(crate) rest_routes: Vec<RestRoute>,
    pub(crate) static_data: HashMap<String, PathBuf>,
    pub(crate) config: Config,
    pub(crate) authorization: Option<AuthorizationFn>,
    pub(crate) limiter: RateLimiter,
    store: Option<Arc<Store>>,
}

impl Context {
    /// Sets up logging, the rate limiter, and (when a database path is
    /// configured) the record store.
    pub fn initialize(config: Config) -> Result<Context, ServerError> {
        logging::init(config.stdout_logging, config.file_logging)?;

        let store = match &config.database_path {
            Some(path) => Some(Arc::new(Store::open(path)?)),
            None => None,
        };
        let limiter = RateLimiter::new(config.max_requests_per_minute);

        Ok(Context {
            procedures: HashMap::new(),
            rest_routes: Vec::new(),
            static_data: HashMap::new(),
            config,
            authorization: None,
            limiter,
            store,
        })
    }

    /// Installs the authorization predicate.
    pub fn with_authorization(
        mut self,
        predicate: impl Fn(&mut RequestContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.authorization = Some(Arc::new(predicate));
        self
    }

    /// Registers a static resource served for requests to `/name`.
    pub fn static_content(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.static_data.insert(name.into(), path.into());
    }

    /// The record store, when a database path was configured.
    pub fn store(&self) -> Option<&Arc<Store>> {
        self.store.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of registered procedures, REST routes included.
    pub fn procedure_count(&self) -> usize {
        self.procedures.len() + self.rest_routes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_without_store() {
        let ctx = Context::initialize(Config {
            stdout_logging: false,
            ..Config::default()
        })
        .unwrap();
        assert!(ctx.store().is_none());
        assert_eq!(ctx.procedure_count(), 0);
    }

    #[test]
    fn test_initialize_with_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = Context::initialize(Config {
            stdout_logging: false,
            database_path: Some(dir.path().join("db")),
            ..Config::default()
        })
        .unwrap();
        assert!(ctx.store().is_some());
    }

    #[test]
    fn test_static_content_registration() {
        let mut ctx = Context::initialize(Config {
            stdout_logging: false,
            ..Config::default()
        })
        .unwrap();
        ctx.static_content("index.html", "www/index.html");
        assert!(ctx.static_data.contains_key("index.html"));
    }
}
