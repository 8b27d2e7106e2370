use crate::server::billing::aggregator::ensure_open;
use crate::server::billing::split::{amount_to_pay, SplitMode};
use crate::server::billing::tip::{compute_tip, TipSpec};
use crate::server::billing::BillingError;
use crate::server::model::bill::{Bill, BillStatus};
use crate::server::model::money::Cents;
use crate::server::model::payment::{Payment, PaymentMode};
use chrono::{DateTime, Utc};

/// Pre-tip amount the next payment under `split` would be charged.
///
/// Never more than what is still outstanding. A session paying for its own
/// items is credited with what it already paid that way. An even split that
/// would leave less than one cent per party behind charges the remainder too,
/// so the last of N equal payments closes the bill. Zero when nothing is owed.
pub(crate) fn charged_base(bill: &Bill, split: &SplitMode) -> Result<Cents, BillingError> {
    ensure_open(bill)?;
    let outstanding = bill.outstanding();
    let share = amount_to_pay(bill, split);
    let mut charged = share.min(outstanding);
    match split {
        SplitMode::SplitEven { party_size } => {
            let dust = outstanding - charged;
            if dust > Cents::ZERO && dust < Cents::new(i64::from(party_size.get())) {
                charged = outstanding;
            }
        }
        SplitMode::MineOnly { session_id } => {
            let paid_before: Cents = bill
                .payments
                .iter()
                .filter(|payment| payment.mode == PaymentMode::MineOnly)
                .filter(|payment| payment.session_id.as_deref() == Some(session_id.as_str()))
                .map(|payment| payment.amount)
                .sum();
            charged = charged.min(share - paid_before);
        }
        SplitMode::Full => {}
    }
    Ok(charged.max(Cents::ZERO))
}

/// Flip an open bill with recorded payments to paid once nothing is outstanding.
pub(crate) fn close_if_settled(bill: &mut Bill, now: DateTime<Utc>) {
    if bill.is_open() && !bill.payments.is_empty() && bill.outstanding() <= Cents::ZERO {
        bill.status = BillStatus::Paid;
        bill.paid_at = Some(now);
    }
}

/// Record a payment and close the bill once nothing is outstanding.
pub(crate) fn settle(
    bill: &mut Bill,
    split: &SplitMode,
    tip: &TipSpec,
    provider_ref: String,
    now: DateTime<Utc>,
) -> Result<Payment, BillingError> {
    let charged = charged_base(bill, split)?;
    if charged <= Cents::ZERO {
        return Err(BillingError::NothingToPay);
    }

    let payment = Payment {
        seq: i32::try_from(bill.payments.len() + 1).unwrap_or(i32::MAX),
        mode: split.mode(),
        session_id: split.session_id().map(str::to_string),
        amount: charged,
        tip: compute_tip(charged, tip),
        provider_ref,
        created_at: now,
    };
    bill.payments.push(payment.clone());
    bill.tip += payment.tip;
    bill.total = bill.due() + bill.tip;
    bill.updated_at = now;
    close_if_settled(bill, now);
    Ok(payment)
}
