//! Pure precondition checks for ledger operations.
//!
//! Each function inspects its inputs and returns either `Ok(())` or the
//! specific rejection the engine relays to the caller. No function here
//! has side effects or touches shared state; absence of a parcel is
//! detected by the engine at lookup, before these checks run.

use cadastre_types::{AccountId, Parcel};

use crate::error::LedgerError;

/// Preconditions for registering a new parcel: a non-empty location, a
/// positive area, and a positive asking price.
pub fn check_registration(location: &str, area: u64, price: u64) -> Result<(), LedgerError> {
    if location.trim().is_empty() {
        return Err(LedgerError::InvalidArgument(
            "location must not be empty".into(),
        ));
    }
    if area == 0 {
        return Err(LedgerError::InvalidArgument(
            "area must be positive".into(),
        ));
    }
    if price == 0 {
        return Err(LedgerError::InvalidArgument(
            "asking price must be positive".into(),
        ));
    }
    Ok(())
}

/// Preconditions for listing a parcel for sale: only the owner may list,
/// and a listing must carry a positive price.
pub fn check_listing(parcel: &Parcel, caller: &AccountId, price: u64) -> Result<(), LedgerError> {
    if !parcel.is_owned_by(caller) {
        return Err(LedgerError::Unauthorized {
            parcel: parcel.id,
            caller: *caller,
        });
    }
    if price == 0 {
        return Err(LedgerError::InvalidArgument(
            "listing price must be positive".into(),
        ));
    }
    Ok(())
}

/// Preconditions for purchasing a listed parcel. Payment must equal the
/// listed price exactly — overpayment has no defined disposition.
pub fn check_purchase(
    parcel: &Parcel,
    caller: &AccountId,
    amount_paid: u64,
) -> Result<(), LedgerError> {
    if !parcel.for_sale {
        return Err(LedgerError::NotForSale(parcel.id));
    }
    if parcel.is_owned_by(caller) {
        return Err(LedgerError::SelfPurchase(parcel.id));
    }
    if amount_paid != parcel.price {
        return Err(LedgerError::PaymentMismatch {
            parcel: parcel.id,
            price: parcel.price,
            paid: amount_paid,
        });
    }
    Ok(())
}

/// Preconditions for transferring ownership: owner-only, and the new
/// owner must differ from the current one.
pub fn check_transfer(
    parcel: &Parcel,
    caller: &AccountId,
    new_owner: &AccountId,
) -> Result<(), LedgerError> {
    if !parcel.is_owned_by(caller) {
        return Err(LedgerError::Unauthorized {
            parcel: parcel.id,
            caller: *caller,
        });
    }
    if *new_owner == parcel.owner {
        return Err(LedgerError::InvalidArgument(
            "new owner must differ from the current owner".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_types::ParcelId;

    fn account(seed: u8) -> AccountId {
        AccountId::from_raw([seed; 32])
    }

    fn listed_parcel(owner: AccountId, price: u64) -> Parcel {
        let mut parcel = Parcel::registered(ParcelId(1), owner, "Plot A", 100, price);
        parcel.for_sale = true;
        parcel
    }

    #[test]
    fn registration_rejects_empty_location() {
        assert!(matches!(
            check_registration("", 100, 500),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_registration("   \t", 100, 500),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn registration_rejects_zero_area() {
        assert!(matches!(
            check_registration("Plot A", 0, 500),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn registration_rejects_zero_price() {
        assert!(matches!(
            check_registration("Plot A", 100, 0),
            Err(LedgerError::InvalidArgument(_))
        ));
        check_registration("Plot A", 100, 1).unwrap();
    }

    #[test]
    fn listing_is_owner_only() {
        let owner = account(1);
        let stranger = account(2);
        let parcel = Parcel::registered(ParcelId(1), owner, "Plot A", 100, 500);

        check_listing(&parcel, &owner, 600).unwrap();
        assert_eq!(
            check_listing(&parcel, &stranger, 600),
            Err(LedgerError::Unauthorized {
                parcel: ParcelId(1),
                caller: stranger
            })
        );
    }

    #[test]
    fn listing_rejects_zero_price() {
        let owner = account(1);
        let parcel = Parcel::registered(ParcelId(1), owner, "Plot A", 100, 500);
        assert!(matches!(
            check_listing(&parcel, &owner, 0),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn purchase_requires_active_listing() {
        let owner = account(1);
        let parcel = Parcel::registered(ParcelId(1), owner, "Plot A", 100, 500);
        assert_eq!(
            check_purchase(&parcel, &account(2), 500),
            Err(LedgerError::NotForSale(ParcelId(1)))
        );
    }

    #[test]
    fn purchase_rejects_self_purchase() {
        let owner = account(1);
        let parcel = listed_parcel(owner, 500);
        assert_eq!(
            check_purchase(&parcel, &owner, 500),
            Err(LedgerError::SelfPurchase(ParcelId(1)))
        );
    }

    #[test]
    fn purchase_requires_exact_payment() {
        let parcel = listed_parcel(account(1), 600);
        let buyer = account(2);

        assert_eq!(
            check_purchase(&parcel, &buyer, 500),
            Err(LedgerError::PaymentMismatch {
                parcel: ParcelId(1),
                price: 600,
                paid: 500
            })
        );
        // No overpayment tolerance either.
        assert!(matches!(
            check_purchase(&parcel, &buyer, 601),
            Err(LedgerError::PaymentMismatch { .. })
        ));
        check_purchase(&parcel, &buyer, 600).unwrap();
    }

    #[test]
    fn transfer_is_owner_only() {
        let owner = account(1);
        let parcel = Parcel::registered(ParcelId(1), owner, "Plot A", 100, 500);

        check_transfer(&parcel, &owner, &account(2)).unwrap();
        assert!(matches!(
            check_transfer(&parcel, &account(3), &account(2)),
            Err(LedgerError::Unauthorized { .. })
        ));
    }

    #[test]
    fn transfer_to_self_is_invalid() {
        let owner = account(1);
        let parcel = Parcel::registered(ParcelId(1), owner, "Plot A", 100, 500);
        assert!(matches!(
            check_transfer(&parcel, &owner, &owner),
            Err(LedgerError::InvalidArgument(_))
        ));
    }
}
