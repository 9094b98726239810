use std::sync::Arc;

use gatewatch_core::store::AppStore;
use tokio::sync::RwLock;

/// The application store as shared between the channel, the reconciler
/// and whatever renders state.
///
/// Lock order: a holder of the channel's internal lock may take this
/// lock, never the other way round.
pub type SharedStore = Arc<RwLock<AppStore>>;

pub fn new_shared_store() -> SharedStore {
    Arc::new(RwLock::new(AppStore::new()))
}
