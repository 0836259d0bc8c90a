//! Collaborators and session state shared by every backend implementation.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, Span};

use crate::body::{fill_body_pref_truncation, CollectionOptions};
use crate::config::{BackendConfig, HeartbeatConfig};
use crate::error::BackendError;
use crate::policy::{PolicyOverrides, PolicySet};
use crate::session::{ProtocolVersion, SessionContext};
use crate::state::StateStore;

/// What a concrete backend embeds: its state store, its log span, the
/// effective configuration and the per request session.
///
/// Only `logon`, `setup` and `log_off` mutate it, so a context shared by
/// several folders of one device must not have those calls interleaved.
pub struct BackendContext {
    state: Arc<dyn StateStore>,
    logger: Span,
    config: BackendConfig,
    session: SessionContext,
}

impl BackendContext {
    pub fn builder() -> BackendContextBuilder {
        BackendContextBuilder::default()
    }

    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    /// Span the backend's events are recorded under.
    pub fn logger(&self) -> &Span {
        &self.logger
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn policies(&self) -> &PolicySet {
        self.session.policies()
    }

    pub fn heartbeat(&self) -> &HeartbeatConfig {
        &self.config.heartbeat
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Record the authenticating credentials.
    ///
    /// No validation happens here; backends that authenticate against a
    /// real store do so before delegating.
    pub fn logon(&mut self, username: &str, password: &str, domain: Option<&str>) -> bool {
        self.session.set_credentials(username, password, domain);
        info!(parent: &self.logger, user = username, "Logon");
        true
    }

    pub fn log_off(&mut self) -> bool {
        debug!(parent: &self.logger, user = ?self.session.auth_user, "Logoff");
        self.session.clear();
        true
    }

    /// Bind the identity whose data is synchronized.
    pub fn setup(&mut self, user: &str) -> bool {
        self.session.user = Some(user.to_string());
        if self.session.is_impersonating() {
            info!(
                parent: &self.logger,
                user,
                auth_user = ?self.session.auth_user,
                "Synchronizing on behalf of another user"
            );
        }
        true
    }

    pub fn auth_user(&self) -> Option<&str> {
        self.session.auth_user.as_deref()
    }

    /// The synchronizing user; folder and item operations require it.
    pub fn user(&self) -> Result<&str, BackendError> {
        self.session.user.as_deref().ok_or_else(|| {
            BackendError::InvalidArgument("setup must be called before data access".to_string())
        })
    }

    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.session.version = version;
    }

    pub fn version(&self) -> ProtocolVersion {
        self.session.version
    }

    /// Fill in the configured truncation size where the device named none.
    pub fn normalize_options(&self, options: &mut CollectionOptions) {
        fill_body_pref_truncation(&mut options.body_prefs, self.config.default_truncation_size);
    }
}

impl fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendContext")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BackendContext`]; `state` is the only required input.
#[derive(Default)]
pub struct BackendContextBuilder {
    state: Option<Arc<dyn StateStore>>,
    logger: Option<Span>,
    config: BackendConfig,
}

impl BackendContextBuilder {
    pub fn state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn logger(mut self, logger: Span) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the whole configuration, policies included.
    pub fn config(mut self, config: BackendConfig) -> Self {
        self.config = config;
        self
    }

    pub fn policies(mut self, overrides: PolicyOverrides) -> Self {
        self.config.policies = overrides;
        self
    }

    pub fn heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.config.heartbeat = heartbeat;
        self
    }

    pub fn build(self) -> Result<BackendContext, BackendError> {
        let state = self.state.ok_or_else(|| {
            BackendError::InvalidArgument("a state store is required".to_string())
        })?;

        let policies = PolicySet::default().merged(&self.config.policies);

        Ok(BackendContext {
            state,
            logger: self.logger.unwrap_or_else(Span::none),
            session: SessionContext::new(policies),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateKey;
    use async_trait::async_trait;

    struct NullStore;

    #[async_trait]
    impl StateStore for NullStore {
        async fn load(&self, _key: &StateKey) -> Result<Option<Vec<u8>>, BackendError> {
            Ok(None)
        }

        async fn save(&self, _key: &StateKey, _blob: &[u8]) -> Result<(), BackendError> {
            Ok(())
        }

        async fn remove(&self, _key: &StateKey) -> Result<bool, BackendError> {
            Ok(false)
        }
    }

    fn context() -> BackendContext {
        BackendContext::builder()
            .state(Arc::new(NullStore))
            .build()
            .unwrap()
    }

    #[test]
    fn test_missing_state_is_invalid_argument() {
        let err = BackendContext::builder()
            .policies(PolicyOverrides {
                pin: Some(false),
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidArgument(_)));
    }

    #[test]
    fn test_policies_merged_at_build() {
        let ctx = BackendContext::builder()
            .state(Arc::new(NullStore))
            .policies(PolicyOverrides {
                pin: Some(false),
                ..Default::default()
            })
            .build()
            .unwrap();
        assert!(!ctx.policies().pin);
        assert_eq!(ctx.policies().inactivity, 5);
    }

    #[test]
    fn test_defaults_without_logger_or_policies() {
        let ctx = context();
        assert_eq!(ctx.policies(), &PolicySet::default());
        assert!(ctx.logger().is_none());
        assert_eq!(ctx.heartbeat(), &HeartbeatConfig::default());
    }

    #[test]
    fn test_logon_and_setup() {
        let mut ctx = context();
        assert!(ctx.user().is_err());
        assert!(ctx.logon("admin", "secret", Some("example.org")));
        assert_eq!(ctx.auth_user(), Some("admin"));
        assert!(ctx.setup("bob"));
        assert_eq!(ctx.user().unwrap(), "bob");
        assert!(ctx.session().is_impersonating());

        assert!(ctx.log_off());
        assert_eq!(ctx.auth_user(), None);
        assert!(ctx.user().is_err());
    }

    #[test]
    fn test_normalize_options_uses_configured_size() {
        let ctx = BackendContext::builder()
            .state(Arc::new(NullStore))
            .config(BackendConfig {
                default_truncation_size: 4096,
                ..Default::default()
            })
            .build()
            .unwrap();
        let mut options: CollectionOptions =
            serde_json::from_str(r#"{"bodyprefs":{"html":{}}}"#).unwrap();
        ctx.normalize_options(&mut options);
        assert_eq!(
            options.body_prefs.values().next().unwrap().truncation_size,
            Some(4096)
        );
    }
}
