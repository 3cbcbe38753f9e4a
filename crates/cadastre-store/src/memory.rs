use std::collections::BTreeMap;
use std::sync::RwLock;

use cadastre_types::{AccountId, Parcel, ParcelId};

use crate::error::{StoreError, StoreResult};
use crate::traits::ParcelStore;

/// In-memory, BTreeMap-based parcel store.
///
/// Records are held behind a `RwLock` for safe concurrent access and are
/// cloned on read. The ordered map makes the ascending-id snapshot of
/// `all()` a straight iteration.
pub struct InMemoryParcelStore {
    inner: RwLock<StoreState>,
}

struct StoreState {
    parcels: BTreeMap<ParcelId, Parcel>,
    /// Next identifier to allocate. Never decreases, never wraps.
    next_id: u64,
}

impl InMemoryParcelStore {
    /// Create a new empty store. The first allocated identifier is 1.
    pub fn new() -> Self {
        Self::with_next_id(1)
    }

    /// Create an empty store whose allocator starts at `next_id`.
    ///
    /// Used by recovery to restore the allocator position, and by tests
    /// that need to exercise the overflow path.
    pub fn with_next_id(next_id: u64) -> Self {
        Self {
            inner: RwLock::new(StoreState {
                parcels: BTreeMap::new(),
                next_id,
            }),
        }
    }

}

impl Default for InMemoryParcelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParcelStore for InMemoryParcelStore {
    fn create(
        &self,
        owner: &AccountId,
        location: &str,
        area: u64,
        price: u64,
    ) -> StoreResult<ParcelId> {
        let mut state = self.inner.write().expect("store lock poisoned");

        let id = ParcelId(state.next_id);
        state.next_id = state
            .next_id
            .checked_add(1)
            .ok_or(StoreError::CapacityExceeded)?;

        let parcel = Parcel::registered(id, *owner, location, area, price);
        state.parcels.insert(id, parcel);
        Ok(id)
    }

    fn get(&self, id: ParcelId) -> Option<Parcel> {
        let state = self.inner.read().expect("store lock poisoned");
        state.parcels.get(&id).cloned()
    }

    fn set(&self, id: ParcelId, parcel: Parcel) -> StoreResult<()> {
        let mut state = self.inner.write().expect("store lock poisoned");
        match state.parcels.get_mut(&id) {
            Some(slot) => {
                *slot = parcel;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn all(&self) -> Vec<Parcel> {
        let state = self.inner.read().expect("store lock poisoned");
        state.parcels.values().cloned().collect()
    }

    fn next_id(&self) -> u64 {
        self.inner.read().expect("store lock poisoned").next_id
    }

    fn discard(&self, id: ParcelId) -> bool {
        let mut state = self.inner.write().expect("store lock poisoned");
        state.parcels.remove(&id).is_some()
    }

    fn len(&self) -> usize {
        self.inner.read().expect("store lock poisoned").parcels.len()
    }
}

impl std::fmt::Debug for InMemoryParcelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryParcelStore")
            .field("parcel_count", &self.len())
            .field("next_id", &self.next_id())
            .finish()
    }
}
