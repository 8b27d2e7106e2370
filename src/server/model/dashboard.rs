use crate::server::model::bill::{Bill, BillLineItem};
use crate::server::model::money::Cents;
use crate::server::model::table::Table;
use crate::server::model::{BillId, LineId, TableId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Session key used for lines ordered without a session tag.
pub(crate) const UNKNOWN_SESSION: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DashboardStats {
    pub open_checks: u64,
    pub today_revenue: Cents,
    pub total_bills_today: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrdersOverview {
    pub orders: Vec<OpenOrder>,
    pub total_open_bills: usize,
}

/// An open bill as the kitchen and floor staff see it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenOrder {
    pub bill_id: BillId,
    pub table_id: TableId,
    pub table_name: String,
    pub table_token: String,
    pub subtotal: Cents,
    pub tax: Cents,
    pub service_fee: Cents,
    pub tip: Cents,
    pub total: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub session_count: usize,
    pub sessions: BTreeMap<String, Vec<OrderLine>>,
    pub all_items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderLine {
    pub id: LineId,
    pub name: String,
    pub quantity: i32,
    pub price: Cents,
    pub line_total: Cents,
    pub ordered_at: DateTime<Utc>,
    pub session_id: String,
}

impl From<&BillLineItem> for OrderLine {
    fn from(line: &BillLineItem) -> Self {
        Self {
            id: line.id,
            name: line.name.clone(),
            quantity: line.quantity,
            price: line.unit_price,
            line_total: line.line_total,
            ordered_at: line.ordered_at,
            session_id: line
                .session_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_SESSION.to_string()),
        }
    }
}

impl OpenOrder {
    pub fn new(bill: &Bill, table: Option<&Table>) -> Self {
        let all_items: Vec<OrderLine> = bill.items.iter().map(OrderLine::from).collect();
        let mut sessions: BTreeMap<String, Vec<OrderLine>> = BTreeMap::new();
        for line in &all_items {
            sessions
                .entry(line.session_id.clone())
                .or_default()
                .push(line.clone());
        }
        Self {
            bill_id: bill.id,
            table_id: bill.table_id,
            table_name: table.map(|t| t.name.clone()).unwrap_or_default(),
            table_token: table.map(|t| t.token.clone()).unwrap_or_default(),
            subtotal: bill.subtotal,
            tax: bill.tax,
            service_fee: bill.service_fee,
            tip: bill.tip,
            total: bill.total,
            created_at: bill.created_at,
            updated_at: bill.updated_at,
            session_count: sessions.len(),
            sessions,
            all_items,
        }
    }
}
