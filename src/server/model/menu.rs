use crate::server::model::money::Cents;
use crate::server::model::{CategoryId, MenuItemId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MenuCategory {
    pub id: CategoryId,
    pub name: String,
    pub position: i32,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MenuItem {
    pub id: MenuItemId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub price: Cents,
    pub image_url: Option<String>,
    pub available: bool,
    /// option schema shown to the diner, e.g. `{"size": ["S", "M", "L"]}`
    pub options: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatchCategoryRequest {
    pub name: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateMenuItemRequest {
    pub category_id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Cents,
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default = "empty_object")]
    pub options: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatchMenuItemRequest {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    pub image_url: Option<String>,
    pub available: Option<bool>,
    pub options: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MenuResponse {
    pub categories: Vec<MenuCategory>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MenuItemsResponse {
    pub items: Vec<MenuItem>,
}

fn default_available() -> bool {
    true
}

pub(crate) fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn check_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name must not be empty".to_string());
    }
    Ok(())
}

fn check_price(price: Cents) -> Result<(), String> {
    if price.is_negative() {
        return Err("price must not be negative".to_string());
    }
    Ok(())
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_name(&self.name)
    }
}

impl PatchCategoryRequest {
    pub fn apply_to(&self, category: &mut MenuCategory) -> Result<(), String> {
        if let Some(name) = &self.name {
            check_name(name)?;
            category.name = name.clone();
        }
        if let Some(position) = self.position {
            category.position = position;
        }
        Ok(())
    }
}

impl CreateMenuItemRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_name(&self.name)?;
        check_price(self.price)
    }

    pub fn into_item(self, id: MenuItemId) -> MenuItem {
        MenuItem {
            id,
            category_id: self.category_id,
            name: self.name,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            available: self.available,
            options: self.options,
        }
    }
}

impl PatchMenuItemRequest {
    /// Apply the supplied fields; later edits never touch line items already on a bill.
    pub fn apply_to(&self, item: &mut MenuItem) -> Result<(), String> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(category_id) = self.category_id {
            item.category_id = category_id;
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(image_url) = &self.image_url {
            item.image_url = Some(image_url.clone()).filter(|url| !url.is_empty());
        }
        if let Some(available) = self.available {
            item.available = available;
        }
        if let Some(options) = &self.options {
            item.options = options.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salmon() -> MenuItem {
        MenuItem {
            id: 3,
            category_id: 2,
            name: "Grilled Salmon".to_string(),
            description: String::new(),
            price: Cents::new(2499),
            image_url: Some("/grilled-salmon-plate.png".to_string()),
            available: true,
            options: empty_object(),
        }
    }

    #[test]
    fn create_request_defaults() {
        let req: CreateMenuItemRequest =
            serde_json::from_str(r#"{"categoryId": 1, "name": "Soup", "price": 6.5}"#).unwrap();
        assert!(req.available);
        assert_eq!(req.options, empty_object());
        let item = req.into_item(9);
        assert_eq!(item.price, Cents::new(650));
        assert_eq!(item.id, 9);
    }

    #[test]
    fn create_request_rejects_negative_price() {
        let req: CreateMenuItemRequest =
            serde_json::from_str(r#"{"categoryId": 1, "name": "Soup", "price": -1}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn patch_changes_selected_fields() {
        let mut item = salmon();
        let patch = PatchMenuItemRequest {
            price: Some(Cents::new(2699)),
            available: Some(false),
            image_url: Some(String::new()),
            ..Default::default()
        };
        patch.apply_to(&mut item).unwrap();
        assert_eq!(item.price, Cents::new(2699));
        assert!(!item.available);
        assert_eq!(item.image_url, None);
        assert_eq!(item.name, "Grilled Salmon");
    }

    #[test]
    fn patch_rejects_blank_name() {
        let mut item = salmon();
        let patch = PatchMenuItemRequest {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(patch.apply_to(&mut item).is_err());
        assert_eq!(item, salmon());
    }
}
