use cadastre_types::ParcelId;
use thiserror::Error;

/// Errors produced by parcel store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The identifier allocator has been exhausted. Practically
    /// unreachable with 64-bit identifiers; included for completeness.
    #[error("parcel identifier allocator exhausted")]
    CapacityExceeded,

    /// The referenced parcel does not exist.
    #[error("{0} not found")]
    NotFound(ParcelId),
}

/// Convenience alias used throughout the store crate.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
