use crate::server::model::settings::Settings;
use crate::server::model::TableId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Table {
    pub id: TableId,
    pub name: String,
    /// QR payload identifying the table in public routes
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTableRequest {
    pub name: String,
    /// generated when absent
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetTablesResponse {
    pub tables: Vec<Table>,
}

/// What a diner's device needs after scanning the table code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableContext {
    pub restaurant_name: String,
    pub table: Table,
    pub settings: Settings,
}
