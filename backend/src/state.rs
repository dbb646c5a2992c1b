use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    services::{identity::IdentityVerifier, persistence::Store, session::SessionManager},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub sessions: SessionManager,
    pub identity: Arc<dyn IdentityVerifier>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Store,
        sessions: SessionManager,
        identity: Arc<dyn IdentityVerifier>,
        config: Config,
    ) -> Self {
        Self {
            store,
            sessions,
            identity,
            config,
        }
    }

    /// Wires the store and session codec from an opened pool and config.
    pub fn from_pool(
        pool: DbPool,
        identity: Arc<dyn IdentityVerifier>,
        config: Config,
    ) -> anyhow::Result<Self> {
        let sessions = SessionManager::from_config(&config)?;
        Ok(Self::new(Store::new(pool), sessions, identity, config))
    }
}
