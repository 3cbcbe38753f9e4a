use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use cadastre_journal::{EntryDraft, JournalConfig, OperationKind, SettlementEntry, SettlementJournal};
use cadastre_store::{InMemoryParcelStore, ParcelStore};
use cadastre_types::{AccountId, Parcel, ParcelId};

use crate::error::LedgerError;
use crate::guard;
use crate::replay;
use crate::traits::{RegistryReader, RegistryWriter};

/// The ledger engine: sole owner of the mutation right over the parcel
/// store.
///
/// Every operation runs validate → mutate → record-settlement under the
/// target parcel's exclusive lock; a failure to record rolls the
/// mutation back, so there is no committed state without a settlement
/// entry and no settlement entry without committed state. Unrelated
/// parcels are mutated in parallel; operations on the same parcel are
/// strictly ordered by arrival.
pub struct LedgerEngine<S: ParcelStore = InMemoryParcelStore> {
    store: S,
    journal: SettlementJournal,
    /// Per-parcel mutation rights, created on demand. Entries live for
    /// the lifetime of the engine — parcels are never deleted.
    locks: Mutex<HashMap<ParcelId, Arc<Mutex<()>>>>,
    /// Serializes registration so that allocation order equals journal
    /// order, which replay depends on.
    alloc_lock: Mutex<()>,
}

impl LedgerEngine {
    /// An engine with a fresh in-memory store and a non-durable journal.
    pub fn in_memory() -> Self {
        Self::new(InMemoryParcelStore::new(), SettlementJournal::in_memory())
    }

    /// An engine with a fresh in-memory store and the given journal.
    pub fn with_journal(journal: SettlementJournal) -> Self {
        Self::new(InMemoryParcelStore::new(), journal)
    }

    /// Open an engine backed by the durable journal segment at `path`,
    /// replaying every applied entry into a fresh store.
    pub fn open_durable(path: &Path, config: JournalConfig) -> Result<Self, LedgerError> {
        let journal = SettlementJournal::open_durable(path, config)?;
        let store = InMemoryParcelStore::new();
        let stats = replay::rebuild(&store, &journal.entries())?;
        info!(
            applied = stats.applied,
            evaluated = stats.evaluated,
            parcels = store.len(),
            "ledger state rebuilt from settlement journal"
        );
        Ok(Self::new(store, journal))
    }
}

impl<S: ParcelStore> LedgerEngine<S> {
    /// Assemble an engine from an existing store and journal. The store
    /// must already agree with the journal (as after [`replay::rebuild`]).
    pub fn new(store: S, journal: SettlementJournal) -> Self {
        Self {
            store,
            journal,
            locks: Mutex::new(HashMap::new()),
            alloc_lock: Mutex::new(()),
        }
    }

    /// The settlement journal backing this engine.
    pub fn journal(&self) -> &SettlementJournal {
        &self.journal
    }

    /// Full copy of the settlement stream, in append order.
    pub fn settlements(&self) -> Vec<SettlementEntry> {
        self.journal.entries()
    }

    fn parcel_lock(&self, id: ParcelId) -> Arc<Mutex<()>> {
        let mut table = self.locks.lock().expect("lock table poisoned");
        table
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns `true` if this exact request by this caller is the most
    /// recently applied operation on the parcel — a resubmission to be
    /// answered from the journal instead of re-executed. Once any other
    /// applied operation touches the parcel, the window is closed and
    /// the request is validated afresh.
    fn already_applied(&self, caller: &AccountId, id: ParcelId, probe: &EntryDraft) -> bool {
        self.journal
            .last_applied_for(id)
            .map(|last| last.actor == *caller && last.matches_request(probe))
            .unwrap_or(false)
    }

    /// Record a rejected attempt for audit. The rejection itself is
    /// returned to the caller regardless of whether recording works.
    fn record_rejection(
        &self,
        kind: OperationKind,
        id: ParcelId,
        caller: &AccountId,
        rejection: &LedgerError,
    ) {
        let draft = EntryDraft::rejected(kind, id, *caller, rejection.to_string());
        if let Err(error) = self.journal.append(draft) {
            warn!(parcel = %id, error = %error, "failed to record rejected attempt");
        }
    }

    /// Append the settlement entry for a mutation already written to the
    /// store; restore `prior` and fail with `SettlementFailed` if the
    /// append does not complete. Caller holds the parcel lock.
    fn commit(&self, draft: EntryDraft, prior: Parcel) -> Result<u64, LedgerError> {
        let id = prior.id;
        match self.journal.append(draft) {
            Ok(entry) => Ok(entry.seq),
            Err(journal_error) => {
                if let Err(restore_error) = self.store.set(id, prior) {
                    warn!(parcel = %id, error = %restore_error, "rollback restore failed");
                }
                warn!(
                    parcel = %id,
                    error = %journal_error,
                    "settlement recording failed; mutation rolled back"
                );
                Err(LedgerError::SettlementFailed(journal_error.to_string()))
            }
        }
    }
}

impl<S: ParcelStore> RegistryWriter for LedgerEngine<S> {
    fn register_land(
        &self,
        caller: &AccountId,
        location: &str,
        area: u64,
        price: u64,
    ) -> Result<ParcelId, LedgerError> {
        guard::check_registration(location, area, price)?;

        let _alloc = self.alloc_lock.lock().expect("alloc lock poisoned");
        let id = ParcelId(self.store.next_id());
        // Pin the new parcel's mutation right before the record becomes
        // visible, so no other call can slip in between creation and its
        // journal entry.
        let lock = self.parcel_lock(id);
        let _held = lock.lock().expect("parcel lock poisoned");

        let created = self.store.create(caller, location, area, price)?;
        debug_assert_eq!(created, id, "store allocator advanced outside the engine");

        let draft = EntryDraft::registration(id, *caller, location, area, price);
        match self.journal.append(draft) {
            Ok(entry) => {
                info!(parcel = %id, owner = %caller, seq = entry.seq, "parcel registered");
                Ok(id)
            }
            Err(error) => {
                self.store.discard(id);
                warn!(
                    parcel = %id,
                    error = %error,
                    "settlement recording failed; registration rolled back"
                );
                Err(LedgerError::SettlementFailed(error.to_string()))
            }
        }
    }

    fn list_for_sale(
        &self,
        caller: &AccountId,
        id: ParcelId,
        price: u64,
    ) -> Result<(), LedgerError> {
        let lock = self.parcel_lock(id);
        let _held = lock.lock().expect("parcel lock poisoned");

        let probe = EntryDraft::listing(id, *caller, price);
        if self.already_applied(caller, id, &probe) {
            debug!(parcel = %id, "duplicate listing request answered from journal");
            return Ok(());
        }

        let Some(parcel) = self.store.get(id) else {
            return Err(LedgerError::NotFound(id));
        };
        if let Err(rejection) = guard::check_listing(&parcel, caller, price) {
            self.record_rejection(OperationKind::Listing, id, caller, &rejection);
            return Err(rejection);
        }

        let prior = parcel.clone();
        let mut updated = parcel;
        updated.price = price;
        updated.for_sale = true;
        self.store.set(id, updated)?;

        let seq = self.commit(probe, prior)?;
        info!(parcel = %id, price, seq, "parcel listed for sale");
        Ok(())
    }

    fn purchase_land(
        &self,
        caller: &AccountId,
        id: ParcelId,
        amount_paid: u64,
    ) -> Result<(), LedgerError> {
        let lock = self.parcel_lock(id);
        let _held = lock.lock().expect("parcel lock poisoned");

        let probe = EntryDraft::purchase(id, *caller, None, amount_paid);
        if self.already_applied(caller, id, &probe) {
            debug!(parcel = %id, "duplicate purchase request answered from journal");
            return Ok(());
        }

        let Some(parcel) = self.store.get(id) else {
            return Err(LedgerError::NotFound(id));
        };
        if let Err(rejection) = guard::check_purchase(&parcel, caller, amount_paid) {
            self.record_rejection(OperationKind::Purchase, id, caller, &rejection);
            return Err(rejection);
        }

        let prior = parcel.clone();
        let seller = parcel.owner;
        let mut updated = parcel;
        updated.owner = *caller;
        updated.for_sale = false;
        self.store.set(id, updated)?;

        // The settlement entry is the credit to the prior owner; it
        // commits or the ownership flip above is undone.
        let draft = EntryDraft::purchase(id, *caller, Some(seller), amount_paid);
        let seq = self.commit(draft, prior)?;
        info!(
            parcel = %id,
            buyer = %caller,
            seller = %seller,
            amount = amount_paid,
            seq,
            "parcel purchased; prior owner credited"
        );
        Ok(())
    }

    fn transfer_ownership(
        &self,
        caller: &AccountId,
        id: ParcelId,
        new_owner: &AccountId,
    ) -> Result<(), LedgerError> {
        let lock = self.parcel_lock(id);
        let _held = lock.lock().expect("parcel lock poisoned");

        let probe = EntryDraft::transfer(id, *caller, *new_owner);
        if self.already_applied(caller, id, &probe) {
            debug!(parcel = %id, "duplicate transfer request answered from journal");
            return Ok(());
        }

        let Some(parcel) = self.store.get(id) else {
            return Err(LedgerError::NotFound(id));
        };
        if let Err(rejection) = guard::check_transfer(&parcel, caller, new_owner) {
            self.record_rejection(OperationKind::Transfer, id, caller, &rejection);
            return Err(rejection);
        }

        let prior = parcel.clone();
        let mut updated = parcel;
        updated.owner = *new_owner;
        self.store.set(id, updated)?;

        let seq = self.commit(probe, prior)?;
        info!(parcel = %id, from = %caller, to = %new_owner, seq, "ownership transferred");
        Ok(())
    }
}

impl<S: ParcelStore> RegistryReader for LedgerEngine<S> {
    fn all_lands(&self) -> Vec<Parcel> {
        self.store.all()
    }

    fn parcel(&self, id: ParcelId) -> Option<Parcel> {
        self.store.get(id)
    }
}
