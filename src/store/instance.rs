//! Process-wide store instance.
//!
//! Exactly one [`HotbarStore`] may own a store file per process. The host
//! creates it once with [`create_instance`] and passes the returned handle
//! to its consumers; [`get_instance`] hands out the same handle to code that
//! cannot receive it directly. [`reset_instance`] releases it and is meant
//! for teardown and test isolation only.

use std::sync::{Arc, Mutex};

use super::HotbarStore;
use crate::catalog::CatalogLookup;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Shared handle to the process-wide store.
pub type SharedStore = Arc<Mutex<HotbarStore>>;

static INSTANCE: Mutex<Option<SharedStore>> = Mutex::new(None);

/// Open the store and register it as the process-wide instance.
///
/// Fails with [`StoreError::AlreadyInitialized`] if an instance exists.
pub fn create_instance(
    config: StoreConfig,
    catalog: Arc<dyn CatalogLookup>,
) -> Result<SharedStore> {
    let mut instance = INSTANCE.lock().expect("store instance lock poisoned");
    if instance.is_some() {
        return Err(StoreError::AlreadyInitialized);
    }

    let store = Arc::new(Mutex::new(HotbarStore::open(config, catalog)));
    *instance = Some(Arc::clone(&store));
    Ok(store)
}

/// The process-wide instance. Fails with [`StoreError::NotInitialized`]
/// before [`create_instance`] or after [`reset_instance`].
pub fn get_instance() -> Result<SharedStore> {
    INSTANCE
        .lock()
        .expect("store instance lock poisoned")
        .clone()
        .ok_or(StoreError::NotInitialized)
}

/// Release the process-wide instance, flushing any pending write.
pub fn reset_instance() {
    let released = INSTANCE.lock().expect("store instance lock poisoned").take();
    if let Some(store) = released {
        store.lock().expect("hotbar store lock poisoned").flush();
    }
}
