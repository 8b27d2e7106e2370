use crate::server::billing::BillingError;
use crate::server::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{error, HttpResponse};
use derive_more::{Display, Error};
use log::error;
use serde_json::json;

#[derive(Debug, Display, Error)]
pub(crate) enum CustomError {
    #[display("server is busy")]
    ServerIsBusy,
    #[display("invalid request: {message}")]
    BadRequest { message: String },
    #[display("database error")]
    DbError,
    #[display("timeout occurred")]
    Timeout,
    #[display("missing or invalid admin token")]
    Unauthorized,
    #[display("resource not found")]
    ResourceNotFound,
    #[display("unknown table")]
    TableNotFound,
    #[display("{message}")]
    Conflict { message: String },
    #[display("{_0}")]
    Billing(BillingError),
}

impl CustomError {
    pub fn bad_request(message: impl ToString) -> Self {
        CustomError::BadRequest {
            message: message.to_string(),
        }
    }

    /// value of the `error` field in the response body
    pub fn kind(&self) -> &'static str {
        match self {
            CustomError::ServerIsBusy => "ServerIsBusy",
            CustomError::BadRequest { .. } => "BadRequest",
            CustomError::DbError => "DbError",
            CustomError::Timeout => "Timeout",
            CustomError::Unauthorized => "Unauthorized",
            CustomError::ResourceNotFound => "ResourceNotFound",
            CustomError::TableNotFound => "TableNotFound",
            CustomError::Conflict { .. } => "Conflict",
            CustomError::Billing(e) => e.kind(),
        }
    }
}

impl From<BillingError> for CustomError {
    fn from(e: BillingError) -> Self {
        CustomError::Billing(e)
    }
}

impl From<StoreError> for CustomError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Busy => CustomError::ServerIsBusy,
            StoreError::Timeout => CustomError::Timeout,
            StoreError::Db { message } => {
                error!("store failed, {}", message);
                CustomError::DbError
            }
            StoreError::Billing(e) => CustomError::Billing(e),
            StoreError::Invalid { message } => CustomError::BadRequest { message },
            e @ StoreError::UnknownCategory { .. } => CustomError::bad_request(e),
            e @ StoreError::DuplicateToken { .. } => CustomError::Conflict {
                message: e.to_string(),
            },
        }
    }
}

impl error::ResponseError for CustomError {
    fn status_code(&self) -> StatusCode {
        match self {
            CustomError::ServerIsBusy | CustomError::DbError => StatusCode::INTERNAL_SERVER_ERROR,
            CustomError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            CustomError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CustomError::Unauthorized => StatusCode::UNAUTHORIZED,
            CustomError::ResourceNotFound | CustomError::TableNotFound => StatusCode::NOT_FOUND,
            CustomError::Conflict { .. } => StatusCode::CONFLICT,
            CustomError::Billing(e) => match e {
                BillingError::BillNotFound | BillingError::LineNotFound { .. } => StatusCode::NOT_FOUND,
                BillingError::BillClosed { .. } | BillingError::LineAlreadyPaid { .. } => StatusCode::CONFLICT,
                BillingError::ItemUnavailable { .. }
                | BillingError::InvalidQuantity { .. }
                | BillingError::AmountTooLarge
                | BillingError::InvalidTip
                | BillingError::InvalidPartySize
                | BillingError::MissingSession
                | BillingError::NothingToPay => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[test]
    fn status_codes() {
        let cases = [
            (CustomError::TableNotFound, 404),
            (CustomError::Billing(BillingError::LineNotFound { line_id: 3 }), 404),
            (CustomError::Billing(BillingError::NothingToPay), 400),
            (CustomError::Billing(BillingError::BillClosed { bill_id: 1 }), 409),
            (CustomError::Billing(BillingError::LineAlreadyPaid { line_id: 1 }), 409),
            (CustomError::Billing(BillingError::AmountTooLarge), 400),
            (CustomError::Unauthorized, 401),
            (CustomError::Timeout, 504),
            (CustomError::ServerIsBusy, 500),
        ];
        for (e, status) in cases {
            assert_eq!(e.status_code().as_u16(), status, "{e}");
        }
    }

    #[test]
    fn store_errors_map_to_http_errors() {
        let e: CustomError = StoreError::DuplicateToken { token: "t".to_string() }.into();
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e: CustomError = StoreError::UnknownCategory { category_id: 9 }.into();
        assert_eq!(e.kind(), "BadRequest");
        let e: CustomError = StoreError::Db { message: "boom".to_string() }.into();
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn error_body_carries_kind_and_message() {
        let res = CustomError::Billing(BillingError::InvalidTip).error_response();
        let body = to_bytes(res.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "InvalidTip");
        assert_eq!(body["message"], "tip must be a non-negative amount");
    }
}
