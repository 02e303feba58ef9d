use crate::store::StoreBackend;
use crate::sync::SyncEngine;

/// Shared application state handed to every request handler.
pub struct AppState {
    pub engine: SyncEngine<StoreBackend>,
}
