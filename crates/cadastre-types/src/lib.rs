//! Foundation types for the cadastre land ledger.
//!
//! This crate provides the identity and record types shared by every other
//! cadastre crate.
//!
//! # Key Types
//!
//! - [`AccountId`] — Opaque, comparable caller/owner handle
//! - [`ParcelId`] — Monotonically allocated parcel identifier
//! - [`Parcel`] — A registered unit of land with owner, price, and sale status

pub mod error;
pub mod identity;
pub mod parcel;

pub use error::TypeError;
pub use identity::{AccountId, AccountMaterial};
pub use parcel::{Parcel, ParcelId};
