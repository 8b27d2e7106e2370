use crate::server::billing::BillingError;
use crate::server::database::connection::Connection;
use crate::server::database::pool::Pool;
use crate::server::model::bill::{Bill, BillLineItem};
use crate::server::model::config::DbConfig;
use crate::server::model::dashboard::DashboardStats;
use crate::server::model::menu::{
    CreateCategoryRequest, CreateMenuItemRequest, MenuCategory, MenuItem, PatchCategoryRequest,
    PatchMenuItemRequest,
};
use crate::server::model::money::{Cents, Percent};
use crate::server::model::payment::Payment;
use crate::server::model::settings::Settings;
use crate::server::model::table::Table;
use crate::server::model::{BillId, CategoryId, LineId, MenuItemId, TableId};
use crate::server::store::{OpenMode, Store, StoreError};
use crate::server::util::time;
use anyhow::Error;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, GenericClient, Row};

const BILL_COLUMNS: &str = "id, table_id, status, subtotal_cents, tax_cents, service_fee_cents, \
    tip_cents, total_cents, next_line_id, created_at, updated_at, paid_at";
const ITEM_COLUMNS: &str =
    "id, category_id, name, description, price_cents, image_url, available, options";

/// Postgres-backed store. Reads go to the read pool, mutations to the write pool.
pub(crate) struct PgStore {
    read_pool: Pool<Client>,
    write_pool: Pool<Client>,
    timeout: Duration,
}

impl PgStore {
    pub async fn connect(config: &DbConfig) -> Result<Self, Error> {
        Ok(Self {
            read_pool: Pool::connect("read", &config.read_conn_str, config.pool_size).await?,
            write_pool: Pool::connect("write", &config.write_conn_str, config.pool_size).await?,
            timeout: config.timeout,
        })
    }

    async fn reader(&self) -> Result<Connection<Client>, StoreError> {
        self.read_pool.acquire(self.timeout).await.ok_or(StoreError::Busy)
    }

    async fn writer(&self) -> Result<Connection<Client>, StoreError> {
        self.write_pool.acquire(self.timeout).await.ok_or(StoreError::Busy)
    }

    /// Fail with `Timeout` once the configured deadline passes. A dropped
    /// transaction is rolled back.
    async fn bounded<T>(
        &self,
        work: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(res) => res,
            Err(_) => {
                warn!("store operation timed out after {:?}", self.timeout);
                Err(StoreError::Timeout)
            }
        }
    }
}

fn db_error(message: String) -> StoreError {
    StoreError::Db { message }
}

fn percent(basis_points: i32) -> Result<Percent, StoreError> {
    u32::try_from(basis_points)
        .ok()
        .and_then(|bp| Percent::from_basis_points(bp).ok())
        .ok_or_else(|| db_error(format!("stored percentage {basis_points} is out of range")))
}

fn basis_points(percent: Percent) -> i32 {
    i32::try_from(percent.basis_points()).unwrap_or(i32::MAX)
}

fn table_from_row(row: &Row) -> Result<Table, StoreError> {
    Ok(Table {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        token: row.try_get("token")?,
        created_at: row.try_get("created_at")?,
    })
}

fn category_from_row(row: &Row) -> Result<MenuCategory, StoreError> {
    Ok(MenuCategory {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        position: row.try_get("position")?,
        items: vec![],
    })
}

fn item_from_row(row: &Row) -> Result<MenuItem, StoreError> {
    Ok(MenuItem {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Cents::new(row.try_get("price_cents")?),
        image_url: row.try_get("image_url")?,
        available: row.try_get("available")?,
        options: row.try_get("options")?,
    })
}

fn bill_from_row(row: &Row) -> Result<Bill, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Bill {
        id: row.try_get("id")?,
        table_id: row.try_get("table_id")?,
        items: vec![],
        subtotal: Cents::new(row.try_get("subtotal_cents")?),
        tax: Cents::new(row.try_get("tax_cents")?),
        service_fee: Cents::new(row.try_get("service_fee_cents")?),
        tip: Cents::new(row.try_get("tip_cents")?),
        total: Cents::new(row.try_get("total_cents")?),
        status: status.parse().map_err(db_error)?,
        payments: vec![],
        next_line_id: row.try_get("next_line_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        paid_at: row.try_get("paid_at")?,
    })
}

fn line_from_row(row: &Row) -> Result<BillLineItem, StoreError> {
    Ok(BillLineItem {
        id: row.try_get("line_id")?,
        menu_item_id: row.try_get("menu_item_id")?,
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        unit_price: Cents::new(row.try_get("unit_price_cents")?),
        line_total: Cents::new(row.try_get("line_total_cents")?),
        options: row.try_get("options")?,
        session_id: row.try_get("session_id")?,
        ordered_at: row.try_get("ordered_at")?,
    })
}

fn payment_from_row(row: &Row) -> Result<Payment, StoreError> {
    let mode: String = row.try_get("mode")?;
    Ok(Payment {
        seq: row.try_get("seq")?,
        mode: mode.parse().map_err(db_error)?,
        session_id: row.try_get("session_id")?,
        amount: Cents::new(row.try_get("amount_cents")?),
        tip: Cents::new(row.try_get("tip_cents")?),
        provider_ref: row.try_get("provider_ref")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Load line items and payments of `bills` in two queries.
async fn attach_children<C: GenericClient>(client: &C, bills: &mut [Bill]) -> Result<(), StoreError> {
    let ids: Vec<BillId> = bills.iter().map(|bill| bill.id).collect();
    let mut lines: HashMap<BillId, Vec<BillLineItem>> = HashMap::new();
    for row in client
        .query(
            "SELECT bill_id, line_id, menu_item_id, name, quantity, unit_price_cents, \
             line_total_cents, options, session_id, ordered_at \
             FROM bill_line WHERE bill_id = ANY($1) ORDER BY bill_id, line_id",
            &[&ids],
        )
        .await?
    {
        lines.entry(row.try_get("bill_id")?).or_default().push(line_from_row(&row)?);
    }
    let mut payments: HashMap<BillId, Vec<Payment>> = HashMap::new();
    for row in client
        .query(
            "SELECT bill_id, seq, mode, session_id, amount_cents, tip_cents, provider_ref, created_at \
             FROM payment WHERE bill_id = ANY($1) ORDER BY bill_id, seq",
            &[&ids],
        )
        .await?
    {
        payments.entry(row.try_get("bill_id")?).or_default().push(payment_from_row(&row)?);
    }
    for bill in bills.iter_mut() {
        bill.items = lines.remove(&bill.id).unwrap_or_default();
        bill.payments = payments.remove(&bill.id).unwrap_or_default();
    }
    Ok(())
}

/// Rows a bill mutation touches: lines are only ever appended or removed and
/// payments only appended.
#[derive(Debug)]
struct BillChanges<'a> {
    removed_lines: Vec<LineId>,
    new_lines: Vec<&'a BillLineItem>,
    new_payments: &'a [Payment],
}

impl<'a> BillChanges<'a> {
    fn between(before: &Bill, after: &'a Bill) -> Self {
        let kept: HashSet<LineId> = after.items.iter().map(|line| line.id).collect();
        let existing: HashSet<LineId> = before.items.iter().map(|line| line.id).collect();
        let paid_before = before.payments.len().min(after.payments.len());
        Self {
            removed_lines: before
                .items
                .iter()
                .map(|line| line.id)
                .filter(|id| !kept.contains(id))
                .collect(),
            new_lines: after
                .items
                .iter()
                .filter(|line| !existing.contains(&line.id))
                .collect(),
            new_payments: &after.payments[paid_before..],
        }
    }
}

async fn persist_changes<C: GenericClient>(client: &C, before: &Bill, after: &Bill) -> Result<(), StoreError> {
    let changes = BillChanges::between(before, after);
    if !changes.removed_lines.is_empty() {
        client
            .execute(
                "DELETE FROM bill_line WHERE bill_id = $1 AND line_id = ANY($2)",
                &[&after.id, &changes.removed_lines],
            )
            .await?;
    }
    for line in changes.new_lines {
        client
            .execute(
                "INSERT INTO bill_line (bill_id, line_id, menu_item_id, name, quantity, \
                 unit_price_cents, line_total_cents, options, session_id, ordered_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                &[
                    &after.id,
                    &line.id,
                    &line.menu_item_id,
                    &line.name,
                    &line.quantity,
                    &line.unit_price.value(),
                    &line.line_total.value(),
                    &line.options,
                    &line.session_id,
                    &line.ordered_at,
                ],
            )
            .await?;
    }
    for payment in changes.new_payments {
        client
            .execute(
                "INSERT INTO payment (bill_id, seq, mode, session_id, amount_cents, tip_cents, \
                 provider_ref, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &after.id,
                    &payment.seq,
                    &payment.mode.to_string(),
                    &payment.session_id,
                    &payment.amount.value(),
                    &payment.tip.value(),
                    &payment.provider_ref,
                    &payment.created_at,
                ],
            )
            .await?;
    }
    client
        .execute(
            "UPDATE bill SET status = $2, subtotal_cents = $3, tax_cents = $4, \
             service_fee_cents = $5, tip_cents = $6, total_cents = $7, next_line_id = $8, \
             updated_at = $9, paid_at = $10 WHERE id = $1",
            &[
                &after.id,
                &after.status.to_string(),
                &after.subtotal.value(),
                &after.tax.value(),
                &after.service_fee.value(),
                &after.tip.value(),
                &after.total.value(),
                &after.next_line_id,
                &after.updated_at,
                &after.paid_at,
            ],
        )
        .await?;
    Ok(())
}

fn unknown_category(e: tokio_postgres::Error, category_id: CategoryId) -> StoreError {
    if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
        return StoreError::UnknownCategory { category_id };
    }
    e.into()
}

impl Store for PgStore {
    async fn settings(&self) -> Result<Settings, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            let row = conn
                .query_opt(
                    "SELECT tax_bp, service_fee_bp, tip_presets_bp FROM settings WHERE id = 1",
                    &[],
                )
                .await?
                .ok_or_else(|| db_error("settings row is missing".to_string()))?;
            let presets: Vec<i32> = row.try_get("tip_presets_bp")?;
            Ok(Settings {
                tax_percent: percent(row.try_get("tax_bp")?)?,
                service_fee_percent: percent(row.try_get("service_fee_bp")?)?,
                tip_presets: presets.into_iter().map(percent).collect::<Result<_, _>>()?,
            })
        })
        .await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let conn = self.writer().await?;
        let presets: Vec<i32> = settings.tip_presets.iter().copied().map(basis_points).collect();
        self.bounded(async {
            conn.execute(
                "INSERT INTO settings (id, tax_bp, service_fee_bp, tip_presets_bp) VALUES (1, $1, $2, $3) \
                 ON CONFLICT (id) DO UPDATE SET tax_bp = $1, service_fee_bp = $2, tip_presets_bp = $3",
                &[
                    &basis_points(settings.tax_percent),
                    &basis_points(settings.service_fee_percent),
                    &presets,
                ],
            )
            .await?;
            Ok(())
        })
        .await
    }

    async fn tables(&self) -> Result<Vec<Table>, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            conn.query("SELECT id, name, token, created_at FROM dining_table ORDER BY id", &[])
                .await?
                .iter()
                .map(table_from_row)
                .collect()
        })
        .await
    }

    async fn table_by_token(&self, token: &str) -> Result<Option<Table>, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            conn.query_opt(
                "SELECT id, name, token, created_at FROM dining_table WHERE token = $1",
                &[&token],
            )
            .await?
            .as_ref()
            .map(table_from_row)
            .transpose()
        })
        .await
    }

    async fn create_table(&self, name: &str, token: &str) -> Result<Table, StoreError> {
        let conn = self.writer().await?;
        self.bounded(async {
            let row = conn
                .query_one(
                    "INSERT INTO dining_table (name, token) VALUES ($1, $2) \
                     RETURNING id, name, token, created_at",
                    &[&name, &token],
                )
                .await
                .map_err(|e| {
                    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                        StoreError::DuplicateToken { token: token.to_string() }
                    } else {
                        e.into()
                    }
                })?;
            table_from_row(&row)
        })
        .await
    }

    async fn menu(&self) -> Result<Vec<MenuCategory>, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            let mut categories = conn
                .query("SELECT id, name, position FROM menu_category ORDER BY position, id", &[])
                .await?
                .iter()
                .map(category_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            let mut items: HashMap<CategoryId, Vec<MenuItem>> = HashMap::new();
            for row in conn
                .query(&format!("SELECT {ITEM_COLUMNS} FROM menu_item ORDER BY id"), &[])
                .await?
            {
                let item = item_from_row(&row)?;
                items.entry(item.category_id).or_default().push(item);
            }
            for category in categories.iter_mut() {
                category.items = items.remove(&category.id).unwrap_or_default();
            }
            Ok(categories)
        })
        .await
    }

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            conn.query_opt(&format!("SELECT {ITEM_COLUMNS} FROM menu_item WHERE id = $1"), &[&id])
                .await?
                .as_ref()
                .map(item_from_row)
                .transpose()
        })
        .await
    }

    async fn create_category(&self, req: &CreateCategoryRequest) -> Result<MenuCategory, StoreError> {
        let conn = self.writer().await?;
        self.bounded(async {
            let row = conn
                .query_one(
                    "INSERT INTO menu_category (name, position) VALUES ($1, $2) RETURNING id, name, position",
                    &[&req.name, &req.position],
                )
                .await?;
            category_from_row(&row)
        })
        .await
    }

    async fn update_category(
        &self,
        id: CategoryId,
        patch: &PatchCategoryRequest,
    ) -> Result<Option<MenuCategory>, StoreError> {
        let mut conn = self.writer().await?;
        self.bounded(async {
            let txn = conn.transaction().await?;
            let Some(row) = txn
                .query_opt("SELECT id, name, position FROM menu_category WHERE id = $1 FOR UPDATE", &[&id])
                .await?
            else {
                return Ok(None);
            };
            let mut category = category_from_row(&row)?;
            patch
                .apply_to(&mut category)
                .map_err(|message| StoreError::Invalid { message })?;
            txn.execute(
                "UPDATE menu_category SET name = $2, position = $3 WHERE id = $1",
                &[&id, &category.name, &category.position],
            )
            .await?;
            txn.commit().await?;
            Ok(Some(category))
        })
        .await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        let conn = self.writer().await?;
        self.bounded(async {
            let deleted = conn.execute("DELETE FROM menu_category WHERE id = $1", &[&id]).await?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_item(&self, req: CreateMenuItemRequest) -> Result<MenuItem, StoreError> {
        let conn = self.writer().await?;
        self.bounded(async {
            let row = conn
                .query_one(
                    &format!(
                        "INSERT INTO menu_item (category_id, name, description, price_cents, image_url, available, options) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ITEM_COLUMNS}"
                    ),
                    &[
                        &req.category_id,
                        &req.name,
                        &req.description,
                        &req.price.value(),
                        &req.image_url,
                        &req.available,
                        &req.options,
                    ],
                )
                .await
                .map_err(|e| unknown_category(e, req.category_id))?;
            item_from_row(&row)
        })
        .await
    }

    async fn update_item(
        &self,
        id: MenuItemId,
        patch: &PatchMenuItemRequest,
    ) -> Result<Option<MenuItem>, StoreError> {
        let mut conn = self.writer().await?;
        self.bounded(async {
            let txn = conn.transaction().await?;
            let Some(row) = txn
                .query_opt(&format!("SELECT {ITEM_COLUMNS} FROM menu_item WHERE id = $1 FOR UPDATE"), &[&id])
                .await?
            else {
                return Ok(None);
            };
            let mut item = item_from_row(&row)?;
            patch
                .apply_to(&mut item)
                .map_err(|message| StoreError::Invalid { message })?;
            txn.execute(
                "UPDATE menu_item SET category_id = $2, name = $3, description = $4, price_cents = $5, \
                 image_url = $6, available = $7, options = $8 WHERE id = $1",
                &[
                    &id,
                    &item.category_id,
                    &item.name,
                    &item.description,
                    &item.price.value(),
                    &item.image_url,
                    &item.available,
                    &item.options,
                ],
            )
            .await
            .map_err(|e| unknown_category(e, item.category_id))?;
            txn.commit().await?;
            Ok(Some(item))
        })
        .await
    }

    async fn delete_item(&self, id: MenuItemId) -> Result<bool, StoreError> {
        let conn = self.writer().await?;
        self.bounded(async {
            let deleted = conn.execute("DELETE FROM menu_item WHERE id = $1", &[&id]).await?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn open_bill(&self, table_id: TableId) -> Result<Option<Bill>, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            let Some(row) = conn
                .query_opt(
                    &format!("SELECT {BILL_COLUMNS} FROM bill WHERE table_id = $1 AND status = 'open'"),
                    &[&table_id],
                )
                .await?
            else {
                return Ok(None);
            };
            let mut bills = [bill_from_row(&row)?];
            attach_children(&*conn, &mut bills).await?;
            let [bill] = bills;
            Ok(Some(bill))
        })
        .await
    }

    async fn open_bills(&self) -> Result<Vec<Bill>, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            let mut bills = conn
                .query(
                    &format!("SELECT {BILL_COLUMNS} FROM bill WHERE status = 'open' ORDER BY updated_at DESC"),
                    &[],
                )
                .await?
                .iter()
                .map(bill_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            attach_children(&*conn, &mut bills).await?;
            Ok(bills)
        })
        .await
    }

    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, StoreError> {
        let conn = self.reader().await?;
        self.bounded(async {
            let row = conn
                .query_one(
                    "SELECT \
                     (SELECT count(*) FROM bill WHERE status = 'open') AS open_checks, \
                     (SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM bill \
                      WHERE status = 'paid' AND paid_at >= $1) AS revenue, \
                     (SELECT count(*) FROM bill WHERE created_at >= $1) AS bills_today",
                    &[&since],
                )
                .await?;
            let open_checks: i64 = row.try_get("open_checks")?;
            let bills_today: i64 = row.try_get("bills_today")?;
            Ok(DashboardStats {
                open_checks: u64::try_from(open_checks).unwrap_or_default(),
                today_revenue: Cents::new(row.try_get("revenue")?),
                total_bills_today: u64::try_from(bills_today).unwrap_or_default(),
            })
        })
        .await
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
        let mut conn = self.writer().await?;
        self.bounded(async {
            let txn = conn.transaction().await?;
            if mode == OpenMode::CreateIfMissing {
                let now = time::helper::get_utc_now();
                let created = txn
                    .execute(
                        "INSERT INTO bill (table_id, created_at, updated_at) VALUES ($1, $2, $2) \
                         ON CONFLICT (table_id) WHERE status = 'open' DO NOTHING",
                        &[&table_id, &now],
                    )
                    .await?;
                if created > 0 {
                    info!("opening a bill for table {}", table_id);
                }
            }
            // row lock held until commit or rollback
            let Some(row) = txn
                .query_opt(
                    &format!(
                        "SELECT {BILL_COLUMNS} FROM bill WHERE table_id = $1 AND status = 'open' FOR UPDATE"
                    ),
                    &[&table_id],
                )
                .await?
            else {
                return Err(BillingError::BillNotFound.into());
            };
            let mut bills = [bill_from_row(&row)?];
            attach_children(&txn, &mut bills).await?;
            let [mut bill] = bills;
            let before = bill.clone();
            // on error the transaction is dropped and rolled back, a bill inserted above included
            let out = f(&mut bill)?;
            persist_changes(&txn, &before, &bill).await?;
            txn.commit().await?;
            Ok((bill, out))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::billing::fixtures::{epoch, line, sample_bill};
    use crate::server::model::payment::PaymentMode;

    fn payment(seq: i32, amount: i64) -> Payment {
        Payment {
            seq,
            mode: PaymentMode::SplitEven,
            session_id: None,
            amount: Cents::new(amount),
            tip: Cents::ZERO,
            provider_ref: format!("ref-{seq}"),
            created_at: epoch(),
        }
    }

    #[test]
    fn unchanged_bill_touches_only_the_bill_row() {
        let bill = sample_bill();
        let changes = BillChanges::between(&bill, &bill);
        assert!(changes.removed_lines.is_empty());
        assert!(changes.new_lines.is_empty());
        assert!(changes.new_payments.is_empty());
    }

    #[test]
    fn removed_and_appended_lines_are_diffed_by_id() {
        let before = sample_bill();
        let mut after = before.clone();
        after.items.retain(|line| line.id != 1);
        after.items.push(line(3, 799, 1, Some("c")));
        after.items.push(line(4, 999, 2, None));
        let changes = BillChanges::between(&before, &after);
        assert_eq!(changes.removed_lines, vec![1]);
        let new_ids: Vec<LineId> = changes.new_lines.iter().map(|line| line.id).collect();
        assert_eq!(new_ids, vec![3, 4]);
    }

    #[test]
    fn only_payments_past_the_old_ledger_are_inserted() {
        let mut before = sample_bill();
        before.payments.push(payment(1, 1388));
        let mut after = before.clone();
        after.payments.push(payment(2, 1387));
        let changes = BillChanges::between(&before, &after);
        assert_eq!(changes.new_payments.len(), 1);
        assert_eq!(changes.new_payments[0].seq, 2);
        assert_eq!(changes.new_payments[0].amount, Cents::new(1387));
        assert!(changes.new_lines.is_empty());
    }
}
