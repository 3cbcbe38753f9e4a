use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::AccountId;

/// Unique identifier of a registered parcel.
///
/// Identifiers are allocated monotonically starting at 1 and are never
/// reused, even when an allocation is rolled back.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ParcelId(pub u64);

impl ParcelId {
    /// The raw numeric identifier.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parcel:{}", self.0)
    }
}

impl From<u64> for ParcelId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// A registered unit of land.
///
/// `location` and `area` are immutable after registration. `owner` changes
/// only through a purchase or an ownership transfer. `price` is meaningful
/// while the parcel is listed and is retained for display afterwards.
/// Money and area are integers in the smallest unit — the ledger core
/// never does floating-point arithmetic on either.
///
/// Invariants maintained by the engine:
/// - `area > 0`
/// - `for_sale` implies `price > 0`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Unique identifier, immutable after creation.
    pub id: ParcelId,
    /// Current owner. Every parcel has a valid owner from creation onward.
    pub owner: AccountId,
    /// Free-text location descriptor (e.g. "Plot 7, North Ridge").
    pub location: String,
    /// Surface area in square meters.
    pub area: u64,
    /// Asking price in the smallest currency unit.
    pub price: u64,
    /// Whether the parcel is currently listed for sale.
    pub for_sale: bool,
}

impl Parcel {
    /// A freshly registered parcel: held by its owner, not listed.
    pub fn registered(
        id: ParcelId,
        owner: AccountId,
        location: impl Into<String>,
        area: u64,
        price: u64,
    ) -> Self {
        Self {
            id,
            owner,
            location: location.into(),
            area,
            price,
            for_sale: false,
        }
    }

    /// Returns `true` if `candidate` is the current owner.
    pub fn is_owned_by(&self, candidate: &AccountId) -> bool {
        self.owner == *candidate
    }
}

impl fmt::Display for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {:?} ({} m², {} — {})",
            self.id,
            self.location,
            self.area,
            self.price,
            if self.for_sale { "listed" } else { "held" }
        )
    }
}
