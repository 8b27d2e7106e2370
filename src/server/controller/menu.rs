use crate::server::controller::auth::Admin;
use crate::server::controller::error::CustomError;
use crate::server::controller::table::resolve_table;
use crate::server::model::menu::{
    CreateCategoryRequest, CreateMenuItemRequest, MenuItemsResponse, MenuResponse,
    PatchCategoryRequest, PatchMenuItemRequest,
};
use crate::server::model::{CategoryId, MenuItemId};
use crate::server::state::AppState;
use crate::server::store::Store;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use log::info;

#[get("/v1/t/{token}/menu")]
/// menu as a diner at the table sees it
pub(crate) async fn get_menu(token: web::Path<String>, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    resolve_table(&data, &token).await?;
    let categories = data.store().menu().await?;
    Ok(web::Json(MenuResponse { categories }))
}

#[get("/v1/admin/menu/categories")]
pub(crate) async fn get_categories(_: Admin, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let categories = data.store().menu().await?;
    Ok(web::Json(MenuResponse { categories }))
}

#[post("/v1/admin/menu/categories")]
pub(crate) async fn post_category(
    _: Admin,
    body: web::Json<CreateCategoryRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    body.validate().map_err(CustomError::bad_request)?;
    let category = data.store().create_category(&body).await?;
    info!("created menu category {} ({})", category.id, category.name);
    Ok(HttpResponse::Created().json(category))
}

#[patch("/v1/admin/menu/categories/{id}")]
pub(crate) async fn patch_category(
    _: Admin,
    id: web::Path<CategoryId>,
    body: web::Json<PatchCategoryRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let category = data
        .store()
        .update_category(id.into_inner(), &body)
        .await?
        .ok_or(CustomError::ResourceNotFound)?;
    Ok(web::Json(category))
}

#[delete("/v1/admin/menu/categories/{id}")]
/// remove a category together with its items
pub(crate) async fn delete_category(
    _: Admin,
    id: web::Path<CategoryId>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let id = id.into_inner();
    if !data.store().delete_category(id).await? {
        return Err(CustomError::ResourceNotFound);
    }
    info!("deleted menu category {}", id);
    Ok(HttpResponse::NoContent().finish())
}

#[get("/v1/admin/menu/items")]
pub(crate) async fn get_items(_: Admin, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let items = data
        .store()
        .menu()
        .await?
        .into_iter()
        .flat_map(|category| category.items)
        .collect();
    Ok(web::Json(MenuItemsResponse { items }))
}

#[post("/v1/admin/menu/items")]
pub(crate) async fn post_item(
    _: Admin,
    body: web::Json<CreateMenuItemRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    body.validate().map_err(CustomError::bad_request)?;
    let item = data.store().create_item(body.into_inner()).await?;
    info!("created menu item {} ({}) at {}", item.id, item.name, item.price);
    Ok(HttpResponse::Created().json(item))
}

#[patch("/v1/admin/menu/items/{id}")]
/// edit a menu item; lines already on bills keep their snapshot
pub(crate) async fn patch_item(
    _: Admin,
    id: web::Path<MenuItemId>,
    body: web::Json<PatchMenuItemRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let item = data
        .store()
        .update_item(id.into_inner(), &body)
        .await?
        .ok_or(CustomError::ResourceNotFound)?;
    Ok(web::Json(item))
}

#[delete("/v1/admin/menu/items/{id}")]
pub(crate) async fn delete_item(
    _: Admin,
    id: web::Path<MenuItemId>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let id = id.into_inner();
    if !data.store().delete_item(id).await? {
        return Err(CustomError::ResourceNotFound);
    }
    info!("deleted menu item {}", id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::controller::auth::ADMIN_TOKEN_HEADER;
    use crate::server::state::test_support::{seeded_state, ADMIN_TOKEN};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn admin(req: test::TestRequest) -> test::TestRequest {
        req.insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN))
    }

    #[actix_web::test]
    async fn diner_sees_the_seeded_menu() {
        let app = test::init_service(App::new().app_data(seeded_state().await).service(get_menu)).await;
        let req = test::TestRequest::get().uri("/v1/t/rest1-1/menu").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let categories = body["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 4);
        assert_eq!(categories[0]["items"][0]["name"], "Bruschetta");
        assert_eq!(categories[0]["items"][0]["price"], 8.99);

        let req = test::TestRequest::get().uri("/v1/t/unknown/menu").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn admin_menu_crud() {
        let app = test::init_service(
            App::new()
                .app_data(seeded_state().await)
                .service(post_category)
                .service(patch_category)
                .service(delete_category)
                .service(get_items)
                .service(post_item)
                .service(patch_item)
                .service(delete_item),
        )
        .await;

        let req = admin(test::TestRequest::post().uri("/v1/admin/menu/categories"))
            .set_json(json!({"name": "Specials", "position": 5}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let category: Value = test::read_body_json(res).await;
        let category_id = category["id"].as_i64().unwrap();

        let req = admin(test::TestRequest::patch().uri(&format!("/v1/admin/menu/categories/{category_id}")))
            .set_json(json!({"name": "Chef's specials"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Chef's specials");
        assert_eq!(body["position"], 5);

        let req = admin(test::TestRequest::post().uri("/v1/admin/menu/items"))
            .set_json(json!({"categoryId": category_id, "name": "Risotto", "price": 18.5}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let item: Value = test::read_body_json(res).await;
        let item_id = item["id"].as_i64().unwrap();

        let req = admin(test::TestRequest::patch().uri(&format!("/v1/admin/menu/items/{item_id}")))
            .set_json(json!({"available": false}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["available"], false);
        assert_eq!(body["price"], 18.5);

        let req = admin(test::TestRequest::get().uri("/v1/admin/menu/items")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"].as_array().map(Vec::len), Some(7));

        let req = admin(test::TestRequest::delete().uri(&format!("/v1/admin/menu/items/{item_id}"))).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        let req = admin(test::TestRequest::delete().uri(&format!("/v1/admin/menu/items/{item_id}"))).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = admin(test::TestRequest::delete().uri(&format!("/v1/admin/menu/categories/{category_id}")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn item_needs_an_existing_category_and_valid_price() {
        let app = test::init_service(App::new().app_data(seeded_state().await).service(post_item)).await;
        let req = admin(test::TestRequest::post().uri("/v1/admin/menu/items"))
            .set_json(json!({"categoryId": 99, "name": "Ghost", "price": 1.0}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        let req = admin(test::TestRequest::post().uri("/v1/admin/menu/items"))
            .set_json(json!({"categoryId": 1, "name": "Cheap", "price": -2.0}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
