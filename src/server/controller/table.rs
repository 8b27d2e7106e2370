use crate::server::controller::auth::Admin;
use crate::server::controller::error::CustomError;
use crate::server::model::table::{CreateTableRequest, GetTablesResponse, Table, TableContext};
use crate::server::state::AppState;
use crate::server::store::Store;
use crate::server::util::token;
use actix_web::{get, post, web, HttpResponse, Responder};
use log::info;

/// Look up the table a public request is addressed to.
pub(crate) async fn resolve_table(data: &AppState, token: &str) -> Result<Table, CustomError> {
    data.store()
        .table_by_token(token)
        .await?
        .ok_or(CustomError::TableNotFound)
}

#[get("/v1/t/{token}/context")]
/// table, restaurant name and settings for a scanned code
pub(crate) async fn get_context(token: web::Path<String>, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let table = resolve_table(&data, &token).await?;
    let settings = data.store().settings().await?;
    Ok(web::Json(TableContext {
        restaurant_name: data.restaurant_name().to_string(),
        table,
        settings,
    }))
}

#[get("/v1/admin/tables")]
pub(crate) async fn get_tables(_: Admin, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let tables = data.store().tables().await?;
    Ok(web::Json(GetTablesResponse { tables }))
}

#[post("/v1/admin/tables")]
/// create a table; a token is generated unless one is supplied
pub(crate) async fn post_table(
    _: Admin,
    body: web::Json<CreateTableRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let CreateTableRequest { name, token: requested } = body.into_inner();
    let name = name.trim();
    if name.is_empty() {
        return Err(CustomError::bad_request("table name must not be empty"));
    }
    let token = requested
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(token::table_token);
    let table = data.store().create_table(name, &token).await?;
    info!("created table {} ({})", table.id, table.name);
    Ok(HttpResponse::Created().json(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::controller::auth::ADMIN_TOKEN_HEADER;
    use crate::server::state::test_support::{seeded_state, ADMIN_TOKEN};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn context_for_known_table() {
        let app = test::init_service(App::new().app_data(seeded_state().await).service(get_context)).await;
        let req = test::TestRequest::get().uri("/v1/t/rest1-2/context").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["restaurantName"], "The Golden Fork");
        assert_eq!(body["table"]["name"], "Table 2");
        assert_eq!(body["settings"]["taxPercent"], 8.0);
    }

    #[actix_web::test]
    async fn unknown_token_is_not_found() {
        let app = test::init_service(App::new().app_data(seeded_state().await).service(get_context)).await;
        let req = test::TestRequest::get().uri("/v1/t/nope/context").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "TableNotFound");
    }

    #[actix_web::test]
    async fn admin_creates_tables() {
        let app = test::init_service(
            App::new()
                .app_data(seeded_state().await)
                .service(get_tables)
                .service(post_table),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/v1/admin/tables")
            .insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN))
            .set_json(json!({"name": "Patio"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let table: Value = test::read_body_json(res).await;
        assert_eq!(table["token"].as_str().map(str::len), Some(32));

        let req = test::TestRequest::post()
            .uri("/v1/admin/tables")
            .insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN))
            .set_json(json!({"name": "Copy", "token": "rest1-1"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri("/v1/admin/tables")
            .insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tables"].as_array().map(Vec::len), Some(6));
    }

    #[actix_web::test]
    async fn admin_routes_need_the_token() {
        let app = test::init_service(App::new().app_data(seeded_state().await).service(get_tables)).await;
        let req = test::TestRequest::get().uri("/v1/admin/tables").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
        let req = test::TestRequest::get()
            .uri("/v1/admin/tables")
            .insert_header((ADMIN_TOKEN_HEADER, "wrong"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
