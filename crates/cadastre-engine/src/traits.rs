use cadastre_types::{AccountId, Parcel, ParcelId};

use crate::error::LedgerError;

/// Write boundary of the ledger: the four state-changing operations.
///
/// Implementations must guarantee that every call is all-or-nothing — a
/// rejection leaves the store unchanged — and that concurrent calls on
/// the same parcel never interleave their read-validate-write sequences.
pub trait RegistryWriter: Send + Sync {
    /// Register a new parcel owned by the caller. The parcel starts in
    /// the held state (not listed).
    fn register_land(
        &self,
        caller: &AccountId,
        location: &str,
        area: u64,
        price: u64,
    ) -> Result<ParcelId, LedgerError>;

    /// List (or re-list) a parcel at the given price. Owner-only.
    fn list_for_sale(
        &self,
        caller: &AccountId,
        id: ParcelId,
        price: u64,
    ) -> Result<(), LedgerError>;

    /// Purchase a listed parcel at its exact price. The payment credits
    /// the prior owner atomically with the ownership flip.
    fn purchase_land(
        &self,
        caller: &AccountId,
        id: ParcelId,
        amount_paid: u64,
    ) -> Result<(), LedgerError>;

    /// Transfer ownership to `new_owner`. Owner-only; the sale flag is
    /// left as-is.
    fn transfer_ownership(
        &self,
        caller: &AccountId,
        id: ParcelId,
        new_owner: &AccountId,
    ) -> Result<(), LedgerError>;
}

/// Read boundary of the ledger.
pub trait RegistryReader: Send + Sync {
    /// Consistent point-in-time snapshot of every parcel, ascending by
    /// identifier.
    fn all_lands(&self) -> Vec<Parcel>;

    /// Point lookup of a single parcel.
    fn parcel(&self, id: ParcelId) -> Option<Parcel>;
}
