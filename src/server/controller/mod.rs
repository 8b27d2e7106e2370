pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod bill;
pub(crate) mod error;
pub(crate) mod menu;
pub(crate) mod table;
