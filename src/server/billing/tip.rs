use crate::server::billing::settlement::charged_base;
use crate::server::billing::split::SplitMode;
use crate::server::billing::BillingError;
use crate::server::model::bill::Bill;
use crate::server::model::money::{Cents, Percent};
use crate::server::model::payment::PaymentQuote;

/// How the gratuity is chosen: a percentage of the amount paid or a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TipSpec {
    Percent(Percent),
    Custom(Cents),
}

impl TipSpec {
    /// Build from request fields in major units; a custom amount always wins.
    pub fn from_request(tip_percent: Option<f64>, custom_tip: Option<f64>) -> Result<Self, BillingError> {
        if let Some(custom) = custom_tip {
            let amount = Cents::from_major(custom).map_err(|_| BillingError::InvalidTip)?;
            if amount.is_negative() {
                return Err(BillingError::InvalidTip);
            }
            return Ok(TipSpec::Custom(amount));
        }
        match tip_percent {
            Some(percent) => Percent::try_from(percent)
                .map(TipSpec::Percent)
                .map_err(|_| BillingError::InvalidTip),
            None => Ok(TipSpec::Percent(Percent::ZERO)),
        }
    }
}

pub(crate) fn compute_tip(amount_to_pay: Cents, tip: &TipSpec) -> Cents {
    match tip {
        TipSpec::Custom(amount) => *amount,
        TipSpec::Percent(percent) => percent.of(amount_to_pay),
    }
}

/// What the payer would be charged right now, without touching the bill.
/// Follows the same ledger rules as a payment, so the quote is what gets recorded.
pub(crate) fn quote(bill: &Bill, split: &SplitMode, tip: &TipSpec) -> Result<PaymentQuote, BillingError> {
    let amount = charged_base(bill, split)?;
    let tip = compute_tip(amount, tip);
    Ok(PaymentQuote {
        mode: split.mode(),
        amount_to_pay: amount,
        tip,
        grand_total: amount + tip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::billing::fixtures::sample_bill;
    use crate::server::model::payment::PaymentMode;

    #[test]
    fn fifteen_percent_on_the_full_bill() {
        let tip = TipSpec::from_request(Some(15.0), None).unwrap();
        let quote = quote(&sample_bill(), &SplitMode::Full, &tip).unwrap();
        assert_eq!(quote.amount_to_pay, Cents::new(2775));
        assert_eq!(quote.tip, Cents::new(416));
        assert_eq!(quote.grand_total, Cents::new(3191));
    }

    #[test]
    fn percentage_applies_to_the_payers_share() {
        let tip = TipSpec::from_request(Some(20.0), None).unwrap();
        let split = SplitMode::MineOnly {
            session_id: "b".to_string(),
        };
        // "b" owes 5.00 + 0.40 + 0.15
        let quote = quote(&sample_bill(), &split, &tip).unwrap();
        assert_eq!(quote.mode, PaymentMode::MineOnly);
        assert_eq!(quote.amount_to_pay, Cents::new(555));
        assert_eq!(quote.tip, Cents::new(111));
    }

    #[test]
    fn custom_amount_wins_over_percentage() {
        let tip = TipSpec::from_request(Some(18.0), Some(3.5)).unwrap();
        assert_eq!(tip, TipSpec::Custom(Cents::new(350)));
        assert_eq!(compute_tip(Cents::new(10_000), &tip), Cents::new(350));
    }

    #[test]
    fn negative_tips_are_rejected() {
        assert_eq!(TipSpec::from_request(None, Some(-1.0)), Err(BillingError::InvalidTip));
        assert_eq!(TipSpec::from_request(Some(-5.0), None), Err(BillingError::InvalidTip));
        assert_eq!(TipSpec::from_request(None, Some(f64::NAN)), Err(BillingError::InvalidTip));
    }

    #[test]
    fn no_tip_by_default() {
        let tip = TipSpec::from_request(None, None).unwrap();
        assert_eq!(compute_tip(Cents::new(2775), &tip), Cents::ZERO);
    }
}
