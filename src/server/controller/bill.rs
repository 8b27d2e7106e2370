use crate::server::billing::aggregator::{add_line, recompute, remove_line, NewLine};
use crate::server::billing::settlement::settle;
use crate::server::billing::split::SplitMode;
use crate::server::billing::tip::{quote, TipSpec};
use crate::server::billing::BillingError;
use crate::server::controller::error::CustomError;
use crate::server::controller::table::resolve_table;
use crate::server::model::bill::{BillResponse, GetBillResponse, PostBillItemRequest};
use crate::server::model::payment::{PaymentReceipt, PaymentRequest};
use crate::server::model::LineId;
use crate::server::state::AppState;
use crate::server::store::{OpenMode, Store};
use crate::server::util::time;
use crate::server::util::token::mock_provider_ref;
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use log::{info, warn};

fn split_and_tip(req: PaymentRequest) -> Result<(SplitMode, TipSpec), BillingError> {
    let split = SplitMode::from_request(req.mode, req.party_size, req.session_id)?;
    let tip = TipSpec::from_request(req.tip_percent, req.custom_tip)?;
    Ok((split, tip))
}

#[get("/v1/t/{token}/bill")]
/// the table's open bill, if any, totalled with the current settings
pub(crate) async fn get_bill(token: web::Path<String>, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let table = resolve_table(&data, &token).await?;
    let settings = data.store().settings().await?;
    let bill = data.store().open_bill(table.id).await?.map(|mut bill| {
        recompute(&mut bill, &settings);
        bill
    });
    Ok(web::Json(GetBillResponse { bill, settings }))
}

#[post("/v1/t/{token}/bill/items")]
/// Add a menu item to the table's bill, opening one if needed
pub(crate) async fn post_bill_item(
    token: web::Path<String>,
    body: web::Json<PostBillItemRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let table = resolve_table(&data, &token).await?;
    let PostBillItemRequest {
        item_id,
        quantity,
        options,
        session_id,
    } = body.into_inner();
    let settings = data.store().settings().await?;
    let item = data.store().menu_item(item_id).await?;
    let now = time::helper::get_utc_now();
    let order = NewLine {
        quantity,
        options,
        session_id,
    };
    let (bill, line_id) = data
        .store()
        .update_open_bill(table.id, OpenMode::CreateIfMissing, |bill| {
            add_line(bill, item_id, item.as_ref(), order, &settings, now)
        })
        .await
        .inspect_err(|e| warn!("post_bill_item failed for table {}, {}", table.id, e))?;
    info!("table {} added line {} (item {}) to bill {}", table.id, line_id, item_id, bill.id);
    Ok(HttpResponse::Created().json(BillResponse { bill }))
}

#[delete("/v1/t/{token}/bill/items/{line_id}")]
/// Remove one line from the table's open bill
pub(crate) async fn delete_bill_item(
    path: web::Path<(String, LineId)>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let (token, line_id) = path.into_inner();
    let table = resolve_table(&data, &token).await?;
    let settings = data.store().settings().await?;
    let now = time::helper::get_utc_now();
    let (bill, removed) = data
        .store()
        .update_open_bill(table.id, OpenMode::MustExist, |bill| {
            remove_line(bill, line_id, &settings, now)
        })
        .await
        .inspect_err(|e| warn!("delete_bill_item failed for table {}, {}", table.id, e))?;
    info!("table {} removed line {} ({}) from bill {}", table.id, removed.id, removed.name, bill.id);
    Ok(web::Json(BillResponse { bill }))
}

#[post("/v1/t/{token}/bill/quote")]
/// what a payment would charge, without recording anything
pub(crate) async fn post_quote(
    token: web::Path<String>,
    body: web::Json<PaymentRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let table = resolve_table(&data, &token).await?;
    let (split, tip) = split_and_tip(body.into_inner())?;
    let settings = data.store().settings().await?;
    let mut bill = data
        .store()
        .open_bill(table.id)
        .await?
        .ok_or(BillingError::BillNotFound)?;
    recompute(&mut bill, &settings);
    Ok(web::Json(quote(&bill, &split, &tip)?))
}

#[post("/v1/t/{token}/bill/pay")]
/// Record a mock payment against the table's open bill
pub(crate) async fn post_payment(
    token: web::Path<String>,
    body: web::Json<PaymentRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let table = resolve_table(&data, &token).await?;
    let (split, tip) = split_and_tip(body.into_inner())?;
    let settings = data.store().settings().await?;
    let provider_ref = mock_provider_ref();
    let now = time::helper::get_utc_now();
    let (bill, payment) = data
        .store()
        .update_open_bill(table.id, OpenMode::MustExist, |bill| {
            recompute(bill, &settings);
            settle(bill, &split, &tip, provider_ref, now)
        })
        .await
        .inspect_err(|e| warn!("post_payment failed for table {}, {}", table.id, e))?;
    info!(
        "bill {} received {} payment {} of {} + {} tip",
        bill.id, payment.mode, payment.provider_ref, payment.amount, payment.tip
    );
    let bill_closed = !bill.is_open();
    if bill_closed {
        info!("bill {} for table {} is paid, total {}", bill.id, table.id, bill.total);
    }
    Ok(HttpResponse::Created().json(PaymentReceipt {
        payment,
        bill_closed,
        bill,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::state::test_support::seeded_state;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    macro_rules! bill_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(seeded_state().await)
                    .service(get_bill)
                    .service(post_bill_item)
                    .service(delete_bill_item)
                    .service(post_quote)
                    .service(post_payment),
            )
            .await
        };
    }

    /// POST a JSON body, returning the status and the JSON response
    macro_rules! post {
        ($app:expr, $uri:expr, $body:expr) => {{
            let req = test::TestRequest::post().uri($uri).set_json($body).to_request();
            let res = test::call_service(&$app, req).await;
            let status = res.status();
            let body: Value = test::read_body_json(res).await;
            (status, body)
        }};
    }

    #[actix_web::test]
    async fn add_items_then_pay_in_full() {
        let app = bill_app!();
        // Ribeye 32.99 x2 and Tiramisu 7.99, tax 8%, fee 5%
        let (status, body) = post!(app, "/v1/t/rest1-1/bill/items", json!({"itemId": 4, "quantity": 2, "sessionId": "a"}));
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["bill"]["subtotal"], 65.98);
        let (_, body) = post!(app, "/v1/t/rest1-1/bill/items", json!({"itemId": 5, "sessionId": "b"}));
        assert_eq!(body["bill"]["subtotal"], 73.97);
        assert_eq!(body["bill"]["tax"], 5.92);
        assert_eq!(body["bill"]["serviceFee"], 3.70);
        assert_eq!(body["bill"]["total"], 83.59);

        let (status, quote) = post!(app, "/v1/t/rest1-1/bill/quote", json!({"mode": "full", "tipPercent": 20}));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["amountToPay"], 83.59);
        assert_eq!(quote["tip"], 16.72);
        assert_eq!(quote["grandTotal"], 100.31);

        let (status, receipt) = post!(app, "/v1/t/rest1-1/bill/pay", json!({"mode": "full", "tipPercent": 20}));
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["billClosed"], true);
        assert_eq!(receipt["bill"]["status"], "paid");
        assert_eq!(receipt["bill"]["total"], 100.31);
        assert!(receipt["payment"]["providerRef"].as_str().unwrap().starts_with("pi_mock_"));

        let req = test::TestRequest::get().uri("/v1/t/rest1-1/bill").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["bill"].is_null());
        assert_eq!(body["settings"]["tipPresets"], json!([15.0, 18.0, 20.0, 25.0]));
    }

    #[actix_web::test]
    async fn split_even_and_mine_only() {
        let app = bill_app!();
        post!(app, "/v1/t/rest1-2/bill/items", json!({"itemId": 1, "sessionId": "a"}));
        post!(app, "/v1/t/rest1-2/bill/items", json!({"itemId": 6, "sessionId": "b"}));
        // 8.99 + 9.99 = 18.98, tax 1.52, fee 0.95, due 21.45
        let (_, quote) = post!(app, "/v1/t/rest1-2/bill/quote", json!({"mode": "split_even", "partySize": 2}));
        assert_eq!(quote["amountToPay"], 10.73);

        let (status, body) = post!(app, "/v1/t/rest1-2/bill/quote", json!({"mode": "split_even", "partySize": 0}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidPartySize");

        let (status, receipt) = post!(app, "/v1/t/rest1-2/bill/pay", json!({"mode": "mine_only", "sessionId": "a"}));
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["billClosed"], false);
        assert_eq!(receipt["payment"]["amount"], 10.16);

        let (status, body) = post!(app, "/v1/t/rest1-2/bill/pay", json!({"mode": "mine_only", "sessionId": "a"}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "NothingToPay");

        let (_, receipt) = post!(app, "/v1/t/rest1-2/bill/pay", json!({"mode": "mine_only", "sessionId": "b", "customTip": 2}));
        assert_eq!(receipt["payment"]["amount"], 11.29);
        assert_eq!(receipt["billClosed"], true);
        assert_eq!(receipt["bill"]["tip"], 2.0);
    }

    #[actix_web::test]
    async fn rejected_requests_leave_the_bill_alone() {
        let app = bill_app!();
        let (status, body) = post!(app, "/v1/t/rest1-3/bill/items", json!({"itemId": 1, "quantity": 0}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidQuantity");
        let (status, body) = post!(app, "/v1/t/rest1-3/bill/items", json!({"itemId": 42}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ItemUnavailable");

        let req = test::TestRequest::get().uri("/v1/t/rest1-3/bill").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["bill"].is_null());

        let (status, body) = post!(app, "/v1/t/rest1-3/bill/pay", json!({"mode": "full"}));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "BillNotFound");

        let (status, body) = post!(app, "/v1/t/rest1-3/bill/pay", json!({"mode": "full", "customTip": -1}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidTip");
    }

    #[actix_web::test]
    async fn remove_line_recomputes_totals() {
        let app = bill_app!();
        post!(app, "/v1/t/rest1-4/bill/items", json!({"itemId": 2}));
        let (_, body) = post!(app, "/v1/t/rest1-4/bill/items", json!({"itemId": 5}));
        let first_line = body["bill"]["items"][0]["id"].as_i64().unwrap();

        let req = test::TestRequest::delete()
            .uri(&format!("/v1/t/rest1-4/bill/items/{first_line}"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["bill"]["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["bill"]["subtotal"], 7.99);

        let req = test::TestRequest::delete()
            .uri(&format!("/v1/t/rest1-4/bill/items/{first_line}"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "LineNotFound");
    }

    #[actix_web::test]
    async fn paid_lines_stay_and_quote_follows_the_ledger() {
        let app = bill_app!();
        post!(app, "/v1/t/rest1-5/bill/items", json!({"itemId": 1, "sessionId": "a"}));
        let (_, body) = post!(app, "/v1/t/rest1-5/bill/items", json!({"itemId": 6, "sessionId": "b"}));
        let paid_line = body["bill"]["items"][0]["id"].as_i64().unwrap();
        let (status, _) = post!(app, "/v1/t/rest1-5/bill/pay", json!({"mode": "mine_only", "sessionId": "a"}));
        assert_eq!(status, StatusCode::CREATED);

        let req = test::TestRequest::delete()
            .uri(&format!("/v1/t/rest1-5/bill/items/{paid_line}"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "LineAlreadyPaid");

        // 21.45 due, 10.16 already paid by "a"
        let (_, quote) = post!(app, "/v1/t/rest1-5/bill/quote", json!({"mode": "full", "tipPercent": 10}));
        assert_eq!(quote["amountToPay"], 11.29);
        assert_eq!(quote["tip"], 1.13);
        let (_, quote) = post!(app, "/v1/t/rest1-5/bill/quote", json!({"mode": "mine_only", "sessionId": "a"}));
        assert_eq!(quote["amountToPay"], 0.0);

        let (_, receipt) = post!(app, "/v1/t/rest1-5/bill/pay", json!({"mode": "full", "tipPercent": 10}));
        assert_eq!(receipt["payment"]["amount"], 11.29);
        assert_eq!(receipt["payment"]["tip"], 1.13);
        assert_eq!(receipt["billClosed"], true);
    }

    #[actix_web::test]
    async fn oversized_quantity_is_rejected() {
        let app = bill_app!();
        let (status, body) = post!(app, "/v1/t/rest1-3/bill/items", json!({"itemId": 4, "quantity": 2147483647}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidQuantity");
    }
}
