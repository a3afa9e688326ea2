//! Application state shared across handlers.

use std::sync::Arc;

use planner_core::{HrefError, HrefResolver};
use planner_store::{
    BoardRepository, DocumentStore, MemoryDocumentStore, MemoryStore, NoteHierarchyStore,
};

use crate::config::ServerConfig;
use crate::schemas::{self, Schemas};

/// Application state shared across all handlers.
///
/// This is cloneable and can be extracted in handlers using `State<AppState>`.
/// Every handle is created once at startup and released by [`AppState::shutdown`].
#[derive(Clone)]
pub struct AppState {
    /// Users, boards, membership and groups.
    repo: Arc<dyn BoardRepository>,
    /// Notes, over the document store.
    notes: NoteHierarchyStore,
    /// Route table plus strictness, shared by every representation.
    hrefs: Arc<HrefResolver>,
    schemas: Arc<Schemas>,
    /// Server configuration.
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Fails if a schema links to an unregistered route or supplies the
    /// wrong parameters for one.
    pub fn new(
        repo: Arc<dyn BoardRepository>,
        documents: Arc<dyn DocumentStore>,
        config: ServerConfig,
    ) -> Result<Self, HrefError> {
        let routes = schemas::route_table(config.public_base_url.as_ref())?;
        let schemas = Schemas::build()?;
        schemas.check(&routes)?;

        Ok(Self {
            repo,
            notes: NoteHierarchyStore::new(documents),
            hrefs: Arc::new(HrefResolver::new(routes, config.strict_hrefs())),
            schemas: Arc::new(schemas),
            config: Arc::new(config),
        })
    }

    /// State over empty in-memory stores.
    pub fn in_memory(config: ServerConfig) -> Result<Self, HrefError> {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryDocumentStore::new()),
            config,
        )
    }

    pub fn repository(&self) -> &Arc<dyn BoardRepository> {
        &self.repo
    }

    pub fn notes(&self) -> &NoteHierarchyStore {
        &self.notes
    }

    pub fn hrefs(&self) -> &HrefResolver {
        &self.hrefs
    }

    pub fn schemas(&self) -> &Schemas {
        &self.schemas
    }

    /// Get a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Closes both stores.
    pub async fn shutdown(&self) {
        self.repo.close().await;
        self.notes.documents().close().await;
        tracing::info!("Stores closed");
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("strict_hrefs", &self.hrefs.is_strict())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_production_state_is_lenient() {
        let config = ServerConfig {
            environment: Environment::Production,
            ..ServerConfig::default()
        };
        let state = AppState::in_memory(config).unwrap();
        assert!(!state.hrefs().is_strict());

        let state = AppState::in_memory(ServerConfig::default()).unwrap();
        assert!(state.hrefs().is_strict());
    }
}
