use cadastre_types::{AccountId, Parcel, ParcelId};

use crate::error::StoreResult;

/// Authoritative parcel record store.
///
/// All implementations must satisfy these invariants:
/// - Identifiers are allocated monotonically and never reused, even when
///   a creation is later discarded.
/// - `all()` returns a consistent point-in-time snapshot in ascending
///   identifier order — it never exposes a half-written record.
/// - The store never validates or authorizes: the engine holds the
///   per-parcel mutation right and is the only intended writer.
pub trait ParcelStore: Send + Sync {
    /// Allocate the next identifier and insert a freshly registered
    /// parcel (held by `owner`, not listed).
    ///
    /// Fails with `CapacityExceeded` only on allocator overflow.
    fn create(
        &self,
        owner: &AccountId,
        location: &str,
        area: u64,
        price: u64,
    ) -> StoreResult<ParcelId>;

    /// Read a parcel by identifier. Returns `None` if absent.
    fn get(&self, id: ParcelId) -> Option<Parcel>;

    /// Replace the record for an existing parcel.
    ///
    /// Fails with `NotFound` if the parcel was never created (or was
    /// discarded). The caller must hold the parcel's mutation right.
    fn set(&self, id: ParcelId, parcel: Parcel) -> StoreResult<()>;

    /// Snapshot of every parcel, ascending by identifier, taken under a
    /// single consistent read.
    fn all(&self) -> Vec<Parcel>;

    /// The identifier the allocator will hand out next.
    ///
    /// A peek, not a reservation — the engine serializes registration
    /// around it so it can pin the new parcel's mutation right before
    /// the record becomes visible.
    fn next_id(&self) -> u64;

    /// Unwind a creation whose settlement recording failed. Returns
    /// `true` if the record existed.
    ///
    /// This is the engine's rollback hook, not a ledger operation — no
    /// ledger operation deletes a parcel, and the discarded identifier is
    /// never reallocated.
    fn discard(&self, id: ParcelId) -> bool;

    /// Number of parcels currently stored.
    fn len(&self) -> usize;

    /// Returns `true` if no parcels are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the parcel exists.
    fn contains(&self, id: ParcelId) -> bool {
        self.get(id).is_some()
    }
}
