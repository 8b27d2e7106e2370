use crate::server::model::menu::empty_object;
use crate::server::model::money::Cents;
use crate::server::model::payment::Payment;
use crate::server::model::settings::Settings;
use crate::server::model::{BillId, LineId, MenuItemId, SessionId, TableId};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BillStatus {
    #[display("open")]
    Open,
    #[display("paid")]
    Paid,
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "paid" => Ok(Self::Paid),
            s => Err(format!("Invalid bill status: {s}")),
        }
    }
}

/// One ordered entry, snapshotted from the menu when it was added.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BillLineItem {
    pub id: LineId,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Cents,
    pub line_total: Cents,
    pub options: Value,
    pub session_id: Option<SessionId>,
    pub ordered_at: DateTime<Utc>,
}

/// The running tab of one table's dining session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Bill {
    pub id: BillId,
    pub table_id: TableId,
    pub items: Vec<BillLineItem>,
    pub subtotal: Cents,
    pub tax: Cents,
    pub service_fee: Cents,
    /// sum of the tips of every payment made so far
    pub tip: Cents,
    pub total: Cents,
    pub status: BillStatus,
    pub payments: Vec<Payment>,
    #[serde(skip)]
    pub next_line_id: LineId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Bill {
    pub fn new(id: BillId, table_id: TableId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            table_id,
            items: vec![],
            subtotal: Cents::ZERO,
            tax: Cents::ZERO,
            service_fee: Cents::ZERO,
            tip: Cents::ZERO,
            total: Cents::ZERO,
            status: BillStatus::Open,
            payments: vec![],
            next_line_id: 1,
            created_at: now,
            updated_at: now,
            paid_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == BillStatus::Open
    }

    /// Everything owed before tips: subtotal, tax and service fee.
    pub fn due(&self) -> Cents {
        self.subtotal + self.tax + self.service_fee
    }

    /// Pre-tip amount already covered by payments.
    pub fn settled(&self) -> Cents {
        self.payments.iter().map(|payment| payment.amount).sum()
    }

    pub fn outstanding(&self) -> Cents {
        self.due() - self.settled()
    }

    pub fn line(&self, line_id: LineId) -> Option<&BillLineItem> {
        self.items.iter().find(|line| line.id == line_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostBillItemRequest {
    pub item_id: MenuItemId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default = "empty_object")]
    pub options: Value,
    pub session_id: Option<SessionId>,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BillResponse {
    pub bill: Bill,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetBillResponse {
    pub bill: Option<Bill>,
    pub settings: Settings,
}
