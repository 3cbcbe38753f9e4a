use cadastre_journal::JournalError;
use cadastre_store::StoreError;
use cadastre_types::{AccountId, ParcelId};

/// Rejections and failures produced by ledger operations.
///
/// Every variant is returned synchronously to the caller; none are fatal
/// to the engine, and the engine never retries on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Malformed input: non-positive area, empty location, zero listing
    /// price, or a transfer to the current owner.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced parcel does not exist.
    #[error("{0} not found")]
    NotFound(ParcelId),

    /// The caller is not the owner required for this operation.
    #[error("{caller} is not the owner of {parcel}")]
    Unauthorized { parcel: ParcelId, caller: AccountId },

    /// Purchase attempted on a parcel that is not currently listed.
    #[error("{0} is not for sale")]
    NotForSale(ParcelId),

    /// The owner attempted to purchase their own listed parcel.
    #[error("owner cannot purchase their own {0}")]
    SelfPurchase(ParcelId),

    /// The amount paid does not exactly equal the listed price. Excess
    /// value has no defined disposition, so no tolerance is applied.
    #[error("payment of {paid} does not match listed price {price} for {parcel}")]
    PaymentMismatch {
        parcel: ParcelId,
        price: u64,
        paid: u64,
    },

    /// The identifier allocator is exhausted. Practically unreachable.
    #[error("parcel identifier allocator exhausted")]
    CapacityExceeded,

    /// Settlement recording failed and the parcel mutation was rolled
    /// back — nothing was committed. This indicates a bug or an I/O
    /// fault, not expected behavior, and is the one condition worth
    /// alerting on.
    #[error("settlement recording failed, parcel state rolled back: {0}")]
    SettlementFailed(String),

    /// The journal stream contradicts itself or the store during
    /// recovery.
    #[error("journal integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    /// The durable journal could not be opened or read.
    #[error("journal recovery failed: {0}")]
    Recovery(String),
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::CapacityExceeded => Self::CapacityExceeded,
            StoreError::NotFound(id) => Self::NotFound(id),
        }
    }
}

impl From<JournalError> for LedgerError {
    fn from(error: JournalError) -> Self {
        match error {
            JournalError::IntegrityViolation { seq, reason } => {
                Self::IntegrityViolation { seq, reason }
            }
            other => Self::Recovery(other.to_string()),
        }
    }
}
