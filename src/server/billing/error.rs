use crate::server::model::{BillId, LineId, MenuItemId};
use derive_more::{Display, Error};

/// Why a bill operation was rejected. The bill is left untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub(crate) enum BillingError {
    #[display("menu item {item_id} is not available")]
    ItemUnavailable { item_id: MenuItemId },
    #[display("quantity must be between 1 and 999, got {quantity}")]
    InvalidQuantity { quantity: i64 },
    #[display("bill total would exceed the supported amount")]
    AmountTooLarge,
    #[display("line {line_id} is not on this bill")]
    LineNotFound { line_id: LineId },
    #[display("tip must be a non-negative amount")]
    InvalidTip,
    #[display("party size must be at least 1")]
    InvalidPartySize,
    #[display("paying for your own items needs a session id")]
    MissingSession,
    #[display("no open bill for this table")]
    BillNotFound,
    #[display("line {line_id} is already covered by a payment")]
    LineAlreadyPaid { line_id: LineId },
    #[display("bill {bill_id} is already paid")]
    BillClosed { bill_id: BillId },
    #[display("nothing left to pay")]
    NothingToPay,
}

impl BillingError {
    /// Stable machine readable name, reported to clients next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::ItemUnavailable { .. } => "ItemUnavailable",
            BillingError::InvalidQuantity { .. } => "InvalidQuantity",
            BillingError::AmountTooLarge => "AmountTooLarge",
            BillingError::LineNotFound { .. } => "LineNotFound",
            BillingError::InvalidTip => "InvalidTip",
            BillingError::InvalidPartySize => "InvalidPartySize",
            BillingError::MissingSession => "MissingSession",
            BillingError::BillNotFound => "BillNotFound",
            BillingError::LineAlreadyPaid { .. } => "LineAlreadyPaid",
            BillingError::BillClosed { .. } => "BillClosed",
            BillingError::NothingToPay => "NothingToPay",
        }
    }
}
