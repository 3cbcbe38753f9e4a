use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use cadastre_types::{AccountId, ParcelId};

/// The kind of ledger operation a settlement entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// A parcel was registered.
    Registration,
    /// A parcel was listed for sale (or re-listed at a new price).
    Listing,
    /// A listed parcel was purchased; the amount credits the prior owner.
    Purchase,
    /// Ownership was transferred without payment.
    Transfer,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Registration => "Registration",
            Self::Listing => "Listing",
            Self::Purchase => "Purchase",
            Self::Transfer => "Transfer",
        };
        write!(f, "{s}")
    }
}

/// Operation-specific payload, carried so the journal alone can rebuild
/// the record store during recovery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationDetail {
    /// The immutable registration fields. The entry's `amount` holds the
    /// initial asking price.
    Registration { location: String, area: u64 },
    /// Nothing beyond the entry's own fields.
    None,
}

/// Whether the recorded attempt was applied or rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The operation was validated and committed.
    Applied,
    /// The operation was rejected; the store was left unchanged.
    Rejected { reason: String },
}

impl Outcome {
    /// Returns `true` for an applied outcome.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Immutable record of one settlement event.
///
/// For a purchase, `actor` is the buyer, `counterpart` the prior owner
/// being credited, and `amount` the payment. For a transfer, `counterpart`
/// is the new owner and `amount` is absent. For a listing or a
/// registration, `amount` is the asking price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEntry {
    /// 1-based sequence number, assigned at append, strictly monotonic.
    pub seq: u64,
    /// The operation this entry records.
    pub kind: OperationKind,
    /// The parcel the operation addressed.
    pub parcel: ParcelId,
    /// The caller that submitted the operation.
    pub actor: AccountId,
    /// The other party, where the operation has one.
    pub counterpart: Option<AccountId>,
    /// Monetary amount in the smallest currency unit, where applicable.
    pub amount: Option<u64>,
    /// Operation-specific payload.
    pub detail: OperationDetail,
    /// Applied or rejected.
    pub outcome: Outcome,
    /// Wall-clock milliseconds since the UNIX epoch at append time.
    pub recorded_at_ms: u64,
}

impl SettlementEntry {
    /// Returns `true` if `draft` describes the same request this entry
    /// recorded.
    ///
    /// A network retry carries identical arguments, so requests are
    /// compared on the fields the caller supplies: operation kind and
    /// amount, plus the counterpart for transfers (the new owner is part
    /// of a transfer request; a purchase's counterpart is derived by the
    /// engine, not submitted).
    pub fn matches_request(&self, draft: &EntryDraft) -> bool {
        if self.kind != draft.kind || self.amount != draft.amount {
            return false;
        }
        match self.kind {
            OperationKind::Transfer => self.counterpart == draft.counterpart,
            _ => true,
        }
    }
}

impl fmt::Display for SettlementEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {} by {}", self.seq, self.kind, self.parcel, self.actor)?;
        if let Some(amount) = self.amount {
            write!(f, " for {amount}")?;
        }
        match &self.outcome {
            Outcome::Applied => write!(f, " (applied)"),
            Outcome::Rejected { reason } => write!(f, " (rejected: {reason})"),
        }
    }
}

/// A settlement entry before the journal assigns its sequence number and
/// timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryDraft {
    pub kind: OperationKind,
    pub parcel: ParcelId,
    pub actor: AccountId,
    pub counterpart: Option<AccountId>,
    pub amount: Option<u64>,
    pub detail: OperationDetail,
    pub outcome: Outcome,
}

impl EntryDraft {
    /// An applied registration. Carries the immutable parcel fields so
    /// recovery can rebuild the record.
    pub fn registration(
        parcel: ParcelId,
        actor: AccountId,
        location: impl Into<String>,
        area: u64,
        price: u64,
    ) -> Self {
        Self {
            kind: OperationKind::Registration,
            parcel,
            actor,
            counterpart: None,
            amount: Some(price),
            detail: OperationDetail::Registration {
                location: location.into(),
                area,
            },
            outcome: Outcome::Applied,
        }
    }

    /// An applied listing at the given price.
    pub fn listing(parcel: ParcelId, actor: AccountId, price: u64) -> Self {
        Self {
            kind: OperationKind::Listing,
            parcel,
            actor,
            counterpart: None,
            amount: Some(price),
            detail: OperationDetail::None,
            outcome: Outcome::Applied,
        }
    }

    /// An applied purchase crediting `seller` with `amount`. The seller
    /// is `None` in resubmission probes, where only the caller-supplied
    /// fields are known.
    pub fn purchase(
        parcel: ParcelId,
        actor: AccountId,
        seller: Option<AccountId>,
        amount: u64,
    ) -> Self {
        Self {
            kind: OperationKind::Purchase,
            parcel,
            actor,
            counterpart: seller,
            amount: Some(amount),
            detail: OperationDetail::None,
            outcome: Outcome::Applied,
        }
    }

    /// An applied ownership transfer to `new_owner`.
    pub fn transfer(parcel: ParcelId, actor: AccountId, new_owner: AccountId) -> Self {
        Self {
            kind: OperationKind::Transfer,
            parcel,
            actor,
            counterpart: Some(new_owner),
            amount: None,
            detail: OperationDetail::None,
            outcome: Outcome::Applied,
        }
    }

    /// A rejected attempt, recorded for audit.
    pub fn rejected(
        kind: OperationKind,
        parcel: ParcelId,
        actor: AccountId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            parcel,
            actor,
            counterpart: None,
            amount: None,
            detail: OperationDetail::None,
            outcome: Outcome::Rejected {
                reason: reason.into(),
            },
        }
    }

    /// Seal the draft into an entry with the given sequence number and
    /// the current wall-clock time.
    pub fn seal(self, seq: u64) -> SettlementEntry {
        SettlementEntry {
            seq,
            kind: self.kind,
            parcel: self.parcel,
            actor: self.actor,
            counterpart: self.counterpart,
            amount: self.amount,
            detail: self.detail,
            outcome: self.outcome,
            recorded_at_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
