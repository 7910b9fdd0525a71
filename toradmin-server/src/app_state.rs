use std::{fmt, sync::Arc};

use shared::config::server::Config;
use tokio::sync::RwLock;

use crate::{
    auth::{
        credentials::{AdminCredentials, CredentialError, CredentialStore},
        session::SessionManager,
    },
    services::control::ServiceController,
};

/// Application state shared across all routes.
pub struct AppState {
    pub(crate) config: Arc<Config>,
    pub(crate) credentials: CredentialStore,
    /// Cached admin account; `None` until setup completes.
    pub(crate) admin: RwLock<Option<Arc<AdminCredentials>>>,
    pub(crate) sessions: SessionManager,
    pub(crate) services: Arc<dyn ServiceController>,
}

impl AppState {
    /// Loads the admin account, if any, from the configured credentials file.
    ///
    /// # Errors
    /// Fails when the credentials file exists but cannot be read or parsed.
    pub fn new(
        config: Arc<Config>,
        sessions: SessionManager,
        services: Arc<dyn ServiceController>,
    ) -> Result<Self, CredentialError> {
        let credentials = CredentialStore::new(config.auth.credentials_path.clone());
        let admin = credentials.load()?.map(Arc::new);
        Ok(Self {
            config,
            credentials,
            admin: RwLock::new(admin),
            sessions,
            services,
        })
    }

    pub(crate) async fn admin(&self) -> Option<Arc<AdminCredentials>> {
        self.admin.read().await.clone()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("credentials", &self.credentials)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
