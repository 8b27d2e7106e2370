//! Bill arithmetic: totals, split shares, tips and settlement.
//!
//! Everything here is pure and synchronous. Callers hand in a bill snapshot
//! that the store holds exclusively and persist the result only when the
//! operation succeeded, so a rejected operation never changes a bill.

pub(crate) mod aggregator;
pub(crate) mod error;
pub(crate) mod settlement;
pub(crate) mod split;
pub(crate) mod tip;

pub(crate) use error::BillingError;
