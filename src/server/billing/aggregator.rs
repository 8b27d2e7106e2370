use crate::server::billing::settlement::close_if_settled;
use crate::server::billing::BillingError;
use crate::server::model::bill::{Bill, BillLineItem};
use crate::server::model::menu::MenuItem;
use crate::server::model::money::Cents;
use crate::server::model::payment::PaymentMode;
use crate::server::model::settings::Settings;
use crate::server::model::{LineId, MenuItemId, SessionId};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub(crate) const MAX_QUANTITY: i64 = 999;
/// Largest subtotal a bill may reach, 100 billion in major units.
const MAX_SUBTOTAL: Cents = Cents::new(10_000_000_000_000);

/// Pre-tip totals of a set of line items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BillTotals {
    pub subtotal: Cents,
    pub tax: Cents,
    pub service_fee: Cents,
}

impl BillTotals {
    pub fn due(&self) -> Cents {
        self.subtotal + self.tax + self.service_fee
    }
}

/// What a diner asked to add; the price and name come from the menu.
#[derive(Debug, Clone)]
pub(crate) struct NewLine {
    pub quantity: i64,
    pub options: Value,
    pub session_id: Option<SessionId>,
}

/// Totals from scratch: tax and fee are derived from the integer subtotal
/// and rounded once, so repeated recomputation never drifts.
pub(crate) fn compute_totals(lines: &[BillLineItem], settings: &Settings) -> BillTotals {
    let subtotal: Cents = lines.iter().map(|line| line.line_total).sum();
    BillTotals {
        subtotal,
        tax: settings.tax_percent.of(subtotal),
        service_fee: settings.service_fee_percent.of(subtotal),
    }
}

/// Refresh every derived amount on `bill` from its lines, payments and `settings`.
pub(crate) fn recompute(bill: &mut Bill, settings: &Settings) {
    let totals = compute_totals(&bill.items, settings);
    bill.subtotal = totals.subtotal;
    bill.tax = totals.tax;
    bill.service_fee = totals.service_fee;
    bill.tip = bill.payments.iter().map(|payment| payment.tip).sum();
    bill.total = totals.due() + bill.tip;
}

pub(crate) fn ensure_open(bill: &Bill) -> Result<(), BillingError> {
    if !bill.is_open() {
        return Err(BillingError::BillClosed { bill_id: bill.id });
    }
    Ok(())
}

/// Append a snapshot of `item` to the bill.
///
/// `item` is the menu lookup result for `item_id`; a missing or unavailable
/// item is rejected. Repeated items are kept as separate lines.
pub(crate) fn add_line(
    bill: &mut Bill,
    item_id: MenuItemId,
    item: Option<&MenuItem>,
    order: NewLine,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<LineId, BillingError> {
    ensure_open(bill)?;
    let item = match item {
        Some(item) if item.available && item.id == item_id => item,
        _ => return Err(BillingError::ItemUnavailable { item_id }),
    };
    let quantity = Some(order.quantity)
        .filter(|quantity| (1..=MAX_QUANTITY).contains(quantity))
        .and_then(|quantity| i32::try_from(quantity).ok())
        .ok_or(BillingError::InvalidQuantity {
            quantity: order.quantity,
        })?;
    let line_total = item.price.checked_mul(quantity).ok_or(BillingError::AmountTooLarge)?;
    match bill.subtotal.checked_add(line_total) {
        Some(subtotal) if subtotal <= MAX_SUBTOTAL => {}
        _ => return Err(BillingError::AmountTooLarge),
    }

    let id = bill.next_line_id;
    bill.next_line_id += 1;
    bill.items.push(BillLineItem {
        id,
        menu_item_id: item.id,
        name: item.name.clone(),
        quantity,
        unit_price: item.price,
        line_total,
        options: order.options,
        session_id: order.session_id.filter(|session| !session.is_empty()),
        ordered_at: now,
    });
    bill.updated_at = now;
    recompute(bill, settings);
    Ok(id)
}

/// Take a line off the bill.
///
/// Lines a session already paid for on its own cannot be removed, nor can any
/// line whose removal would leave the bill owing less than was paid. A removal
/// that brings the outstanding amount to exactly zero closes the bill.
pub(crate) fn remove_line(
    bill: &mut Bill,
    line_id: LineId,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<BillLineItem, BillingError> {
    ensure_open(bill)?;
    let position = bill
        .items
        .iter()
        .position(|line| line.id == line_id)
        .ok_or(BillingError::LineNotFound { line_id })?;
    let line = &bill.items[position];
    let paid_by_owner = line.session_id.is_some()
        && bill
            .payments
            .iter()
            .any(|payment| payment.mode == PaymentMode::MineOnly && payment.session_id == line.session_id);
    if paid_by_owner {
        return Err(BillingError::LineAlreadyPaid { line_id });
    }
    let remaining: Vec<BillLineItem> = bill.items.iter().filter(|line| line.id != line_id).cloned().collect();
    if compute_totals(&remaining, settings).due() < bill.settled() {
        return Err(BillingError::LineAlreadyPaid { line_id });
    }

    let removed = bill.items.remove(position);
    bill.updated_at = now;
    recompute(bill, settings);
    close_if_settled(bill, now);
    Ok(removed)
}
