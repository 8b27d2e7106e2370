use crate::server::model::bill::Bill;
use crate::server::model::money::Cents;
use crate::server::model::SessionId;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a payer's share of the bill is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PaymentMode {
    #[default]
    #[display("full")]
    Full,
    #[display("split_even")]
    SplitEven,
    #[display("mine_only")]
    MineOnly,
}

impl FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "split_even" => Ok(Self::SplitEven),
            "mine_only" => Ok(Self::MineOnly),
            s => Err(format!("Invalid payment mode: {s}")),
        }
    }
}

/// A settled payment against a bill.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Payment {
    /// position in the bill's ledger, starting at 1
    pub seq: i32,
    pub mode: PaymentMode,
    pub session_id: Option<SessionId>,
    /// pre-tip share of the bill this payment covered
    pub amount: Cents,
    pub tip: Cents,
    pub provider_ref: String,
    pub created_at: DateTime<Utc>,
}

/// Body of both the quote and the pay endpoints.
///
/// `customTip` (major units) wins over `tipPercent`; no tip when both are absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentRequest {
    #[serde(default)]
    pub mode: PaymentMode,
    pub party_size: Option<u32>,
    pub session_id: Option<SessionId>,
    pub tip_percent: Option<f64>,
    pub custom_tip: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentQuote {
    pub mode: PaymentMode,
    pub amount_to_pay: Cents,
    pub tip: Cents,
    pub grand_total: Cents,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentReceipt {
    pub payment: Payment,
    pub bill_closed: bool,
    pub bill: Bill,
}
