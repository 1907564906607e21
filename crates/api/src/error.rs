//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Every service error converts into
//! `AppError`, which picks the status code, captures server-side failures to
//! Sentry and answers with `{"error": "<message>"}`. Internal details never
//! reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::admin::AdminError;
use crate::services::analysis::AnalysisError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::consultations::ConsultationError;
use crate::services::content::ContentError;
use crate::services::import::ImportError;
use crate::services::livekit::LiveKitError;
use crate::services::rooms::RoomError;
use crate::services::stripe::StripeError;
use crate::services::treatments::TreatmentError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Treatment error: {0}")]
    Treatment(#[from] TreatmentError),

    #[error("Consultation error: {0}")]
    Consultation(#[from] ConsultationError),

    #[error("Room error: {0}")]
    Room(#[from] RoomError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";
const UPSTREAM: &str = "External service error";

fn repository(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
        }
    }
}

fn auth(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned()),
        AuthError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "Invalid API key".to_owned()),
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_owned()),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_owned(),
        ),
        AuthError::AlreadyClaimed => (
            StatusCode::BAD_REQUEST,
            "This account already has a password".to_owned(),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_owned()),
        AuthError::InvalidAgentName => (
            StatusCode::BAD_REQUEST,
            "Agent name must contain letters or digits".to_owned(),
        ),
        AuthError::Repository(e) => repository(e),
        AuthError::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned()),
    }
}

fn stripe(err: &StripeError) -> (StatusCode, String) {
    match err {
        StripeError::Api { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        StripeError::InvalidSignature | StripeError::StaleSignature => {
            (StatusCode::BAD_REQUEST, "Invalid signature".to_owned())
        }
        StripeError::Payload(_) => (StatusCode::BAD_REQUEST, "Invalid payload".to_owned()),
        StripeError::Http(_) => (StatusCode::BAD_GATEWAY, UPSTREAM.to_owned()),
    }
}

fn livekit(err: &LiveKitError) -> (StatusCode, String) {
    match err {
        LiveKitError::Token(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned()),
        LiveKitError::Http(_) | LiveKitError::Api { .. } => {
            (StatusCode::BAD_GATEWAY, UPSTREAM.to_owned())
        }
    }
}

fn bad_request(err: &impl ToString) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn not_found(err: &impl ToString) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, err.to_string())
}

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(e) => repository(e),
            Self::Auth(e) => auth(e),
            Self::Stripe(e) => stripe(e),
            Self::Catalog(e) => match e {
                CatalogError::Invalid(_) | CatalogError::CategoryCycle => bad_request(e),
                CatalogError::NotFound(_) => not_found(e),
                CatalogError::Repository(e) => repository(e),
            },
            Self::Cart(e) => match e {
                CartError::InvalidQuantity | CartError::InsufficientStock { .. } => bad_request(e),
                CartError::ProductNotFound | CartError::ItemNotFound => not_found(e),
                CartError::Repository(e) => repository(e),
            },
            Self::Checkout(e) => match e {
                CheckoutError::OrderNotFound => not_found(e),
                CheckoutError::StripeUnavailable => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
                CheckoutError::Stripe(e) => stripe(e),
                CheckoutError::Repository(e) => repository(e),
                CheckoutError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
                }
                _ => bad_request(e),
            },
            Self::Admin(e) => match e {
                AdminError::CannotDeleteSelf | AdminError::InvalidTransition { .. } => bad_request(e),
                AdminError::NotFound(_) => not_found(e),
                AdminError::Repository(e) => repository(e),
            },
            Self::Import(e) => match e {
                ImportError::Repository(e) => repository(e),
                _ => bad_request(e),
            },
            Self::Analysis(e) => match e {
                AnalysisError::NotFound(_) => not_found(e),
                AnalysisError::UserMismatch | AnalysisError::Invalid(_) => bad_request(e),
                AnalysisError::Repository(e) => repository(e),
            },
            Self::Treatment(e) => match e {
                TreatmentError::NotFound(_) => not_found(e),
                TreatmentError::Invalid(_) => bad_request(e),
                TreatmentError::Repository(e) => repository(e),
            },
            Self::Consultation(e) => match e {
                ConsultationError::NotFound => not_found(e),
                ConsultationError::Invalid(_) => bad_request(e),
                ConsultationError::Repository(e) => repository(e),
            },
            Self::Room(e) => match e {
                RoomError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
                RoomError::NotFound => not_found(e),
                RoomError::Invalid(_) => bad_request(e),
                RoomError::LiveKit(e) => livekit(e),
                RoomError::Repository(e) => repository(e),
            },
            Self::Content(e) => match e {
                ContentError::Invalid(_) => bad_request(e),
                ContentError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
                }
                ContentError::NotFound => not_found(e),
                ContentError::Repository(e) => repository(e),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_owned()),
            Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server and upstream errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after authentication.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use skinior_core::{OrderStatus, ProductId};

    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");
    }

    #[test]
    fn test_plain_status_codes() {
        assert_eq!(status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status(AppError::Internal("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_repository_mapping() {
        assert_eq!(status(RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(RepositoryError::Conflict("dup".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(RepositoryError::DataCorruption("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(CatalogError::Repository(RepositoryError::Conflict("sku".into()))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_service_mapping() {
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status(AuthError::AlreadyClaimed), StatusCode::BAD_REQUEST);
        assert_eq!(status(CatalogError::CategoryCycle), StatusCode::BAD_REQUEST);
        assert_eq!(status(CartError::ItemNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(CheckoutError::InsufficientStock {
                product_id: ProductId::new(1),
                available: 0
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(CheckoutError::StripeUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(CheckoutError::OrderNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(StripeError::InvalidSignature), StatusCode::BAD_REQUEST);
        assert_eq!(status(AdminError::CannotDeleteSelf), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(AdminError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(ImportError::TooFewRows), StatusCode::BAD_REQUEST);
        assert_eq!(status(AnalysisError::UserMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(status(AnalysisError::NotFound("analysis session")), StatusCode::NOT_FOUND);
        assert_eq!(status(TreatmentError::NotFound("milestone")), StatusCode::NOT_FOUND);
        assert_eq!(status(TreatmentError::Invalid("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ConsultationError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(CheckoutError::Repository(RepositoryError::Conflict("order number".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(status(RoomError::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(ContentError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_details_hidden() {
        let (_, message) = AppError::Internal("pool exhausted".into()).status_and_message();
        assert_eq!(message, "Internal server error");
        let (_, message) =
            AppError::from(RepositoryError::DataCorruption("bad enum".into())).status_and_message();
        assert_eq!(message, "Internal server error");
    }
}
