use crate::server::controller::error::CustomError;
use crate::server::state::AppState;
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use log::warn;
use std::future::{ready, Ready};

pub(crate) const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Extractor guarding admin handlers: the request must carry the configured
/// admin token in `X-Admin-Token`.
pub(crate) struct Admin;

impl FromRequest for Admin {
    type Error = CustomError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let authorized = req
            .app_data::<web::Data<AppState>>()
            .zip(req.headers().get(ADMIN_TOKEN_HEADER))
            .is_some_and(|(data, token)| token.as_bytes() == data.admin_token().as_bytes());
        if !authorized {
            warn!("rejected admin request to {}", req.path());
            return ready(Err(CustomError::Unauthorized));
        }
        ready(Ok(Admin))
    }
}
