use crate::server::billing::BillingError;
use crate::server::model::bill::Bill;
use crate::server::model::money::Cents;
use crate::server::model::payment::PaymentMode;
use crate::server::model::SessionId;
use std::num::NonZeroU32;

/// A payment mode together with the parameters it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SplitMode {
    Full,
    SplitEven { party_size: NonZeroU32 },
    MineOnly { session_id: SessionId },
}

impl SplitMode {
    pub fn from_request(
        mode: PaymentMode,
        party_size: Option<u32>,
        session_id: Option<SessionId>,
    ) -> Result<Self, BillingError> {
        match mode {
            PaymentMode::Full => Ok(SplitMode::Full),
            PaymentMode::SplitEven => party_size
                .and_then(NonZeroU32::new)
                .map(|party_size| SplitMode::SplitEven { party_size })
                .ok_or(BillingError::InvalidPartySize),
            PaymentMode::MineOnly => session_id
                .filter(|session| !session.is_empty())
                .map(|session_id| SplitMode::MineOnly { session_id })
                .ok_or(BillingError::MissingSession),
        }
    }

    pub fn mode(&self) -> PaymentMode {
        match self {
            SplitMode::Full => PaymentMode::Full,
            SplitMode::SplitEven { .. } => PaymentMode::SplitEven,
            SplitMode::MineOnly { .. } => PaymentMode::MineOnly,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            SplitMode::MineOnly { session_id } => Some(session_id.as_str()),
            _ => None,
        }
    }
}

/// Pre-tip amount a payer owes under `split`, from the bill's current totals.
///
/// `MineOnly` charges the session's own lines plus their proportional share of
/// tax and service fee; a session without lines owes zero.
pub(crate) fn amount_to_pay(bill: &Bill, split: &SplitMode) -> Cents {
    match split {
        SplitMode::Full => bill.due(),
        SplitMode::SplitEven { party_size } => bill.due().split_even(*party_size),
        SplitMode::MineOnly { session_id } => {
            let mine: Cents = bill
                .items
                .iter()
                .filter(|line| line.session_id.as_deref() == Some(session_id.as_str()))
                .map(|line| line.line_total)
                .sum();
            mine + bill.tax.apportion(mine, bill.subtotal)
                + bill.service_fee.apportion(mine, bill.subtotal)
        }
    }
}
