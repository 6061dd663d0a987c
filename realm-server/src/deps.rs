//! The single `Dependencies` record constructed once at startup and
//! passed into every handler and effect (`spec.md` §9 "Module-level
//! singletons... replaced by explicit dependency injection").

use std::sync::{Arc, Mutex};

use slog::Logger;

use realm_catalogs::Catalogs;
use realm_persistence::Store;
use realm_shared::config::Config;
use realm_world::map_manager::MapManager;
use realm_world::registry::SessionRegistry;

use crate::session::SessionTable;

#[derive(Clone)]
pub struct Dependencies {
    pub config: Arc<Config>,
    pub catalogs: Arc<Catalogs>,
    pub store: Store,
    pub world: Arc<Mutex<MapManager>>,
    pub registry: Arc<SessionRegistry>,
    pub sessions: Arc<SessionTable>,
    pub log: Logger,
}
