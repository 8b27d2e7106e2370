use crate::server::store::Backend;

pub(crate) struct AppState {
    store: Backend,
    restaurant_name: String,
    admin_token: String,
}

impl AppState {
    pub fn new(store: Backend, restaurant_name: String, admin_token: String) -> Self {
        Self {
            store,
            restaurant_name,
            admin_token,
        }
    }

    pub fn store(&self) -> &Backend {
        &self.store
    }

    pub fn restaurant_name(&self) -> &str {
        &self.restaurant_name
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::server::store::memory::MemoryStore;
    use actix_web::web;

    pub const ADMIN_TOKEN: &str = "test-admin-token";

    /// App state over a freshly seeded in-memory store.
    pub async fn seeded_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            Backend::Memory(MemoryStore::seeded().await),
            "The Golden Fork".to_string(),
            ADMIN_TOKEN.to_string(),
        ))
    }
}
