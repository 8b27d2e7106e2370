use crate::server::billing::aggregator::recompute;
use crate::server::controller::auth::Admin;
use crate::server::controller::error::CustomError;
use crate::server::model::dashboard::{OpenOrder, OrdersOverview};
use crate::server::model::settings::PatchSettingsRequest;
use crate::server::model::CommonRequestParams;
use crate::server::state::AppState;
use crate::server::store::Store;
use crate::server::util::time;
use actix_web::{get, patch, web, Responder};
use log::info;

#[get("/v1/admin/dashboard")]
/// open checks, revenue and bill count since midnight UTC
pub(crate) async fn get_dashboard(_: Admin, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let since = time::start_of_day(time::helper::get_utc_now());
    let stats = data.store().dashboard_stats(since).await?;
    Ok(web::Json(stats))
}

#[get("/v1/admin/orders")]
/// open bills with their lines grouped by diner session, totals at current settings
pub(crate) async fn get_orders(
    _: Admin,
    query: web::Query<CommonRequestParams>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let settings = data.store().settings().await?;
    let mut bills = data.store().open_bills().await?;
    bills.iter_mut().for_each(|bill| recompute(bill, &settings));
    let tables = data.store().tables().await?;
    let total_open_bills = bills.len();
    let orders = bills
        .iter()
        .map(|bill| OpenOrder::new(bill, tables.iter().find(|t| t.id == bill.table_id)))
        .collect();
    Ok(web::Json(OrdersOverview {
        orders: query.paginate(orders),
        total_open_bills,
    }))
}

#[get("/v1/admin/settings")]
pub(crate) async fn get_settings(_: Admin, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    Ok(web::Json(data.store().settings().await?))
}

#[patch("/v1/admin/settings")]
/// Partially update the billing settings. Open bills pick them up on their next change.
pub(crate) async fn patch_settings(
    _: Admin,
    body: web::Json<PatchSettingsRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let current = data.store().settings().await?;
    let settings = body
        .into_inner()
        .apply(&current)
        .map_err(CustomError::bad_request)?;
    data.store().save_settings(&settings).await?;
    info!(
        "settings updated: tax {}%, service fee {}%",
        f64::from(settings.tax_percent),
        f64::from(settings.service_fee_percent)
    );
    Ok(web::Json(settings))
}
