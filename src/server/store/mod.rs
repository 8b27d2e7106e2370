//! Persistence behind the HTTP handlers.
//!
//! Bill mutations go through [`Store::update_open_bill`]: the store holds the
//! table's open bill exclusively while the pure billing closure runs, and
//! writes the result back only when the closure succeeds.

pub(crate) mod memory;
pub(crate) mod postgres;

use crate::server::billing::BillingError;
use crate::server::model::bill::Bill;
use crate::server::model::dashboard::DashboardStats;
use crate::server::model::menu::{
    CreateCategoryRequest, CreateMenuItemRequest, MenuCategory, MenuItem, PatchCategoryRequest,
    PatchMenuItemRequest,
};
use crate::server::model::settings::Settings;
use crate::server::model::table::Table;
use crate::server::model::{CategoryId, MenuItemId, TableId};
use chrono::{DateTime, Utc};
use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub(crate) enum StoreError {
    #[display("no database connection available")]
    Busy,
    #[display("store operation timed out")]
    Timeout,
    #[display("database error: {message}")]
    Db { message: String },
    #[display("{_0}")]
    Billing(BillingError),
    #[display("invalid request: {message}")]
    Invalid { message: String },
    #[display("category {category_id} does not exist")]
    UnknownCategory { category_id: CategoryId },
    #[display("table token {token} is already in use")]
    DuplicateToken { token: String },
}

impl From<BillingError> for StoreError {
    fn from(e: BillingError) -> Self {
        StoreError::Billing(e)
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        StoreError::Db {
            message: e.to_string(),
        }
    }
}

/// What `update_open_bill` does when the table has no open bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenMode {
    /// start a bill; it is discarded again if the closure fails
    CreateIfMissing,
    /// fail with `BillNotFound`
    MustExist,
}

pub(crate) trait Store: Send + Sync + 'static {
    async fn settings(&self) -> Result<Settings, StoreError>;

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError>;

    async fn tables(&self) -> Result<Vec<Table>, StoreError>;

    async fn table_by_token(&self, token: &str) -> Result<Option<Table>, StoreError>;

    async fn create_table(&self, name: &str, token: &str) -> Result<Table, StoreError>;

    /// categories ordered by position then id, each with its items
    async fn menu(&self) -> Result<Vec<MenuCategory>, StoreError>;

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, StoreError>;

    async fn create_category(&self, req: &CreateCategoryRequest) -> Result<MenuCategory, StoreError>;

    async fn update_category(
        &self,
        id: CategoryId,
        patch: &PatchCategoryRequest,
    ) -> Result<Option<MenuCategory>, StoreError>;

    /// deletes the category's items too
    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError>;

    async fn create_item(&self, req: CreateMenuItemRequest) -> Result<MenuItem, StoreError>;

    async fn update_item(
        &self,
        id: MenuItemId,
        patch: &PatchMenuItemRequest,
    ) -> Result<Option<MenuItem>, StoreError>;

    async fn delete_item(&self, id: MenuItemId) -> Result<bool, StoreError>;

    async fn open_bill(&self, table_id: TableId) -> Result<Option<Bill>, StoreError>;

    /// every open bill, most recently updated first
    async fn open_bills(&self) -> Result<Vec<Bill>, StoreError>;

    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, StoreError>;

    /// Run `f` against the table's open bill while no other mutation of that
    /// table can interleave, persisting the bill only if `f` succeeds.
    async fn update_open_bill<T, F>(
        &self,
        table_id: TableId,
        mode: OpenMode,
        f: F,
    ) -> Result<(Bill, T), StoreError>
    where
        F: FnOnce(&mut Bill) -> Result<T, BillingError> + Send,
        T: Send;
}

/// The store chosen at start-up.
pub(crate) enum Backend {
    Memory(memory::MemoryStore),
    Postgres(postgres::PgStore),
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Backend::Memory($store) => $call,
            Backend::Postgres($store) => $call,
        }
    };
}

impl Store for Backend {
    async fn settings(&self) -> Result<Settings, StoreError> {
        dispatch!(self, s => s.settings().await)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        dispatch!(self, s => s.save_settings(settings).await)
    }

    async fn tables(&self) -> Result<Vec<Table>, StoreError> {
        dispatch!(self, s => s.tables().await)
    }

    async fn table_by_token(&self, token: &str) -> Result<Option<Table>, StoreError> {
        dispatch!(self, s => s.table_by_token(token).await)
    }

    async fn create_table(&self, name: &str, token: &str) -> Result<Table, StoreError> {
        dispatch!(self, s => s.create_table(name, token).await)
    }

    async fn menu(&self) -> Result<Vec<MenuCategory>, StoreError> {
        dispatch!(self, s => s.menu().await)
    }

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        dispatch!(self, s => s.menu_item(id).await)
    }

    async fn create_category(&self, req: &CreateCategoryRequest) -> Result<MenuCategory, StoreError> {
        dispatch!(self, s => s.create_category(req).await)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        patch: &PatchCategoryRequest,
    ) -> Result<Option<MenuCategory>, StoreError> {
        dispatch!(self, s => s.update_category(id, patch).await)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        dispatch!(self, s => s.delete_category(id).await)
    }

    async fn create_item(&self, req: CreateMenuItemRequest) -> Result<MenuItem, StoreError> {
        dispatch!(self, s => s.create_item(req).await)
    }

    async fn update_item(
        &self,
        id: MenuItemId,
        patch: &PatchMenuItemRequest,
    ) -> Result<Option<MenuItem>, StoreError> {
        dispatch!(self, s => s.update_item(id, patch).await)
    }

    async fn delete_item(&self, id: MenuItemId) -> Result<bool, StoreError> {
        dispatch!(self, s => s.delete_item(id).await)
    }

    async fn open_bill(&self, table_id: TableId) -> Result<Option<Bill>, StoreError> {
        dispatch!(self, s => s.open_bill(table_id).await)
    }

    async fn open_bills(&self) -> Result<Vec<Bill>, StoreError> {
        dispatch!(self, s => s.open_bills().await)
    }

    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, StoreError> {
        dispatch!(self, s => s.dashboard_stats(since).await)
    }

    async fn update_open_bill<T, F>(
        &self,
        table_id: TableId,
        mode: OpenMode,
        f: F,
    ) -> Result<(Bill, T), StoreError>
    where
        F: FnOnce(&mut Bill) -> Result<T, BillingError> + Send,
        T: Send,
    {
        dispatch!(self, s => s.update_open_bill(table_id, mode, f).await)
    }
}
