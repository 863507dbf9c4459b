use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

/// Transport-facing error. Every variant carries a human-readable detail
/// message that is returned verbatim in the JSON body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    Dependency(String),
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Dependency(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, detail = %self, "Request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Domain error taxonomy of the lifecycle engine: not-found, precondition
/// violations, invalid inputs, and wrapped store failures. Converted into
/// `AppError` at the route boundary.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Unit {0} was not found.")]
    UnitNotFound(Uuid),
    #[error("Unit {0} is not available for a new lease.")]
    UnitNotAvailable(Uuid),
    #[error("Unit {0} already has an active lease.")]
    UnitAlreadyHasActiveLease(Uuid),
    #[error("Tenant {0} was not found.")]
    TenantNotFound(Uuid),
    #[error("Tenant {0} already has an active lease.")]
    TenantAlreadyHasActiveLease(Uuid),
    #[error("Lease {0} was not found.")]
    LeaseNotFound(Uuid),
    #[error("Lease {0} cannot be renewed in its current status.")]
    CannotRenewLease(Uuid),
    #[error("Lease {0} is already expired.")]
    LeaseAlreadyExpired(Uuid),
    #[error("Lease {0} cannot be cancelled in its current status.")]
    CannotCancelLease(Uuid),
    #[error("Lease {0} has not reached its end date yet.")]
    LeaseNotEnded(Uuid),
    #[error("Lease {0} must be active to change its payment due day.")]
    CannotChangeDueDay(Uuid),
    #[error("The new payment due day matches the current one.")]
    DueDayUnchanged,
    #[error("Payment {0} was not found.")]
    PaymentNotFound(Uuid),
    #[error("Payment {0} cannot be marked as paid in its current status.")]
    PaymentNotPayable(Uuid),
    #[error("Payment {0} cannot be cancelled in its current status.")]
    CannotCancelPayment(Uuid),
    #[error("Payment {payment} does not belong to lease {lease}.")]
    PaymentNotOnLease { payment: Uuid, lease: Uuid },
    #[error("Painting fee paid would exceed the lease total.")]
    PaintingFeePaidExceedsTotal,
    #[error("Payment due day must be between 1 and 31, got {0}.")]
    InvalidDueDay(i16),
    #[error("Painting fee installments must be between 1 and 4, got {0}.")]
    InvalidInstallments(i16),
    #[error("Monthly rent must be greater than zero.")]
    InvalidRentValue,
    #[error("Payment amount must be greater than zero.")]
    InvalidPaymentAmount,
    #[error("Invalid effective date: {0}")]
    InvalidEffectiveDate(String),
    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<LifecycleError> for AppError {
    fn from(error: LifecycleError) -> Self {
        if let LifecycleError::Store(inner) = error {
            return inner;
        }
        let detail = error.to_string();
        match error {
            LifecycleError::UnitNotFound(_)
            | LifecycleError::TenantNotFound(_)
            | LifecycleError::LeaseNotFound(_)
            | LifecycleError::PaymentNotFound(_) => AppError::NotFound(detail),
            LifecycleError::UnitNotAvailable(_)
            | LifecycleError::UnitAlreadyHasActiveLease(_)
            | LifecycleError::TenantAlreadyHasActiveLease(_)
            | LifecycleError::CannotRenewLease(_)
            | LifecycleError::LeaseAlreadyExpired(_)
            | LifecycleError::CannotCancelLease(_)
            | LifecycleError::LeaseNotEnded(_)
            | LifecycleError::CannotChangeDueDay(_)
            | LifecycleError::PaymentNotPayable(_)
            | LifecycleError::CannotCancelPayment(_)
            | LifecycleError::PaintingFeePaidExceedsTotal => AppError::Conflict(detail),
            _ => AppError::UnprocessableEntity(detail),
        }
    }
}
