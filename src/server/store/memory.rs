use crate::server::billing::BillingError;
use crate::server::model::bill::{Bill, BillStatus};
use crate::server::model::dashboard::DashboardStats;
use crate::server::model::menu::{
    empty_object, CreateCategoryRequest, CreateMenuItemRequest, MenuCategory, MenuItem,
    PatchCategoryRequest, PatchMenuItemRequest,
};
use crate::server::model::money::{Cents, Percent};
use crate::server::model::settings::Settings;
use crate::server::model::table::Table;
use crate::server::model::{BillId, CategoryId, MenuItemId, TableId};
use crate::server::store::{OpenMode, Store, StoreError};
use crate::server::util::time;
use chrono::{DateTime, Utc};
use log::info;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Bills of one table: at most one open, plus the closed history.
#[derive(Debug, Default)]
struct TableBills {
    open: Option<Bill>,
    closed: Vec<Bill>,
}

#[derive(Debug, Default)]
struct Catalog {
    categories: Vec<MenuCategory>,
    items: Vec<MenuItem>,
    next_category_id: CategoryId,
    next_item_id: MenuItemId,
}

#[derive(Debug)]
struct Inner {
    settings: RwLock<Settings>,
    tables: RwLock<Vec<Table>>,
    catalog: RwLock<Catalog>,
    /// one lock per table, so mutations of different tables never wait on each other
    bills: RwLock<HashMap<TableId, Arc<Mutex<TableBills>>>>,
    next_bill_id: AtomicI64,
}

/// Process-local store, for development and tests.
#[derive(Debug, Clone)]
pub(crate) struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings: RwLock::new(settings),
                tables: RwLock::new(vec![]),
                catalog: RwLock::new(Catalog {
                    next_category_id: 1,
                    next_item_id: 1,
                    ..Default::default()
                }),
                bills: RwLock::new(HashMap::new()),
                next_bill_id: AtomicI64::new(1),
            }),
        }
    }

    /// The demo restaurant: five tables `rest1-1` to `rest1-5` and a small menu.
    pub async fn seeded() -> Self {
        let store = Self::new(Settings {
            tax_percent: Percent::whole(8).unwrap_or_default(),
            service_fee_percent: Percent::whole(5).unwrap_or_default(),
            tip_presets: [15, 18, 20, 25]
                .into_iter()
                .filter_map(|p| Percent::whole(p).ok())
                .collect(),
        });
        {
            let now = time::helper::get_utc_now();
            let mut tables = store.inner.tables.write().await;
            for n in 1..=5 {
                tables.push(Table {
                    id: n,
                    name: format!("Table {n}"),
                    token: format!("rest1-{n}"),
                    created_at: now,
                });
            }
        }
        {
            let mut catalog = store.inner.catalog.write().await;
            for (position, name) in ["Appetizers", "Main Courses", "Desserts", "Beverages"]
                .into_iter()
                .enumerate()
            {
                let id = catalog.next_category_id;
                catalog.next_category_id += 1;
                catalog.categories.push(MenuCategory {
                    id,
                    name: name.to_string(),
                    position: position as i32,
                    items: vec![],
                });
            }
            let seed = [
                (1, "Bruschetta", "Toasted bread with tomatoes, garlic, and basil", 899, Some("/classic-bruschetta.png")),
                (1, "Calamari", "Crispy fried squid with marinara sauce", 1299, Some("/fried-calamari.png")),
                (2, "Grilled Salmon", "Fresh Atlantic salmon with lemon butter sauce", 2499, Some("/grilled-salmon-plate.png")),
                (2, "Ribeye Steak", "12oz prime ribeye with garlic mashed potatoes", 3299, Some("/grilled-ribeye.png")),
                (3, "Tiramisu", "Classic Italian dessert with espresso and mascarpone", 799, Some("/classic-tiramisu.png")),
                (4, "House Wine", "Red or white wine by the glass", 999, None),
            ];
            for (category_id, name, description, price, image) in seed {
                let id = catalog.next_item_id;
                catalog.next_item_id += 1;
                catalog.items.push(MenuItem {
                    id,
                    category_id,
                    name: name.to_string(),
                    description: description.to_string(),
                    price: Cents::new(price),
                    image_url: image.map(str::to_string),
                    available: true,
                    options: if name == "House Wine" {
                        json!({"color": ["red", "white"]})
                    } else {
                        empty_object()
                    },
                });
            }
        }
        store
    }

    async fn table_bills(&self, table_id: TableId) -> Arc<Mutex<TableBills>> {
        if let Some(entry) = self.inner.bills.read().await.get(&table_id) {
            return entry.clone();
        }
        self.inner
            .bills
            .write()
            .await
            .entry(table_id)
            .or_default()
            .clone()
    }

    async fn all_table_bills(&self) -> Vec<Arc<Mutex<TableBills>>> {
        self.inner.bills.read().await.values().cloned().collect()
    }

    fn next_bill_id(&self) -> BillId {
        self.inner.next_bill_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Store for MemoryStore {
    async fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.inner.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        *self.inner.settings.write().await = settings.clone();
        Ok(())
    }

    async fn tables(&self) -> Result<Vec<Table>, StoreError> {
        Ok(self.inner.tables.read().await.clone())
    }

    async fn table_by_token(&self, token: &str) -> Result<Option<Table>, StoreError> {
        Ok(self
            .inner
            .tables
            .read()
            .await
            .iter()
            .find(|table| table.token == token)
            .cloned())
    }

    async fn create_table(&self, name: &str, token: &str) -> Result<Table, StoreError> {
        let mut tables = self.inner.tables.write().await;
        if tables.iter().any(|table| table.token == token) {
            return Err(StoreError::DuplicateToken {
                token: token.to_string(),
            });
        }
        let table = Table {
            id: tables.iter().map(|table| table.id).max().unwrap_or(0) + 1,
            name: name.to_string(),
            token: token.to_string(),
            created_at: time::helper::get_utc_now(),
        };
        tables.push(table.clone());
        Ok(table)
    }

    async fn menu(&self) -> Result<Vec<MenuCategory>, StoreError> {
        let catalog = self.inner.catalog.read().await;
        let mut categories = catalog.categories.clone();
        categories.sort_by_key(|category| (category.position, category.id));
        for category in categories.iter_mut() {
            category.items = catalog
                .items
                .iter()
                .filter(|item| item.category_id == category.id)
                .cloned()
                .collect();
        }
        Ok(categories)
    }

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        let catalog = self.inner.catalog.read().await;
        Ok(catalog.items.iter().find(|item| item.id == id).cloned())
    }

    async fn create_category(&self, req: &CreateCategoryRequest) -> Result<MenuCategory, StoreError> {
        let mut catalog = self.inner.catalog.write().await;
        let category = MenuCategory {
            id: catalog.next_category_id,
            name: req.name.clone(),
            position: req.position,
            items: vec![],
        };
        catalog.next_category_id += 1;
        catalog.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        patch: &PatchCategoryRequest,
    ) -> Result<Option<MenuCategory>, StoreError> {
        let mut catalog = self.inner.catalog.write().await;
        let Some(category) = catalog.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        let mut updated = category.clone();
        patch
            .apply_to(&mut updated)
            .map_err(|message| StoreError::Invalid { message })?;
        *category = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        let mut catalog = self.inner.catalog.write().await;
        let before = catalog.categories.len();
        catalog.categories.retain(|category| category.id != id);
        if catalog.categories.len() == before {
            return Ok(false);
        }
        catalog.items.retain(|item| item.category_id != id);
        Ok(true)
    }

    async fn create_item(&self, req: CreateMenuItemRequest) -> Result<MenuItem, StoreError> {
        let mut catalog = self.inner.catalog.write().await;
        if !catalog.categories.iter().any(|c| c.id == req.category_id) {
            return Err(StoreError::UnknownCategory {
                category_id: req.category_id,
            });
        }
        let item = req.into_item(catalog.next_item_id);
        catalog.next_item_id += 1;
        catalog.items.push(item.clone());
        Ok(item)
    }

    async fn update_item(
        &self,
        id: MenuItemId,
        patch: &PatchMenuItemRequest,
    ) -> Result<Option<MenuItem>, StoreError> {
        let mut catalog = self.inner.catalog.write().await;
        if let Some(category_id) = patch.category_id {
            if !catalog.categories.iter().any(|c| c.id == category_id) {
                return Err(StoreError::UnknownCategory { category_id });
            }
        }
        let Some(item) = catalog.items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        let mut updated = item.clone();
        patch
            .apply_to(&mut updated)
            .map_err(|message| StoreError::Invalid { message })?;
        *item = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_item(&self, id: MenuItemId) -> Result<bool, StoreError> {
        let mut catalog = self.inner.catalog.write().await;
        let before = catalog.items.len();
        catalog.items.retain(|item| item.id != id);
        Ok(catalog.items.len() != before)
    }

    async fn open_bill(&self, table_id: TableId) -> Result<Option<Bill>, StoreError> {
        let entry = self.table_bills(table_id).await;
        let bills = entry.lock().await;
        Ok(bills.open.clone())
    }

    async fn open_bills(&self) -> Result<Vec<Bill>, StoreError> {
        let mut open = vec![];
        for entry in self.all_table_bills().await {
            if let Some(bill) = &entry.lock().await.open {
                open.push(bill.clone());
            }
        }
        open.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(open)
    }

    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, StoreError> {
        let mut stats = DashboardStats::default();
        for entry in self.all_table_bills().await {
            let bills = entry.lock().await;
            for bill in bills.open.iter().chain(bills.closed.iter()) {
                if bill.is_open() {
                    stats.open_checks += 1;
                }
                if bill.created_at >= since {
                    stats.total_bills_today += 1;
                }
                if bill.status == BillStatus::Paid && bill.paid_at.is_some_and(|at| at >= since) {
                    stats.today_revenue += bill.total;
                }
            }
        }
        Ok(stats)
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
        let entry = self.table_bills(table_id).await;
        let mut bills = entry.lock().await;
        let mut bill = match (&bills.open, mode) {
            (Some(open), _) => open.clone(),
            (None, OpenMode::CreateIfMissing) => {
                Bill::new(self.next_bill_id(), table_id, time::helper::get_utc_now())
            }
            (None, OpenMode::MustExist) => return Err(BillingError::BillNotFound.into()),
        };
        let out = f(&mut bill)?;
        if bill.is_open() {
            if bills.open.is_none() {
                info!("opened bill {} for table {}", bill.id, table_id);
            }
            bills.open = Some(bill.clone());
        } else {
            bills.open = None;
            bills.closed.push(bill.clone());
        }
        Ok((bill, out))
    }
}
