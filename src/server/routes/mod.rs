//! Route table for the whole API.

use crate::server::controller::error::CustomError;
use crate::server::controller::{admin, bill, menu, table};
use actix_web::web;

/// Register every handler, with malformed bodies, paths and queries reported
/// as `BadRequest` in the usual error shape.
pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|e, _| CustomError::bad_request(e).into()))
        .app_data(web::PathConfig::default().error_handler(|e, _| CustomError::bad_request(e).into()))
        .app_data(web::QueryConfig::default().error_handler(|e, _| CustomError::bad_request(e).into()))
        // diner facing, addressed by table token
        .service(table::get_context)
        .service(menu::get_menu)
        .service(bill::get_bill)
        .service(bill::post_bill_item)
        .service(bill::delete_bill_item)
        .service(bill::post_quote)
        .service(bill::post_payment)
        // staff facing
        .service(admin::get_dashboard)
        .service(admin::get_orders)
        .service(admin::get_settings)
        .service(admin::patch_settings)
        .service(table::get_tables)
        .service(table::post_table)
        .service(menu::get_categories)
        .service(menu::post_category)
        .service(menu::patch_category)
        .service(menu::delete_category)
        .service(menu::get_items)
        .service(menu::post_item)
        .service(menu::patch_item)
        .service(menu::delete_item);
}
