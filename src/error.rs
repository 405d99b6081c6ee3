use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

/// Named stages of the transactional order operations, carried by failures so
/// callers can tell which step aborted the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStep {
    Begin,
    Validate,
    ResolvePrices,
    ComputeDiscounts,
    InsertOrderHeader,
    InsertLineItems,
    InsertUserOrderIndex,
    FetchExistingOrder,
    UpdateStatus,
    DeleteExistingLines,
    RecalculateTotal,
    PersistTotal,
    MarkDeleted,
    RemoveUserOrderIndex,
    Commit,
    Rollback,
}

impl OrderStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStep::Begin => "begin",
            OrderStep::Validate => "validate",
            OrderStep::ResolvePrices => "resolve_prices",
            OrderStep::ComputeDiscounts => "compute_discounts",
            OrderStep::InsertOrderHeader => "insert_order_header",
            OrderStep::InsertLineItems => "insert_line_items",
            OrderStep::InsertUserOrderIndex => "insert_user_order_index",
            OrderStep::FetchExistingOrder => "fetch_existing_order",
            OrderStep::UpdateStatus => "update_status",
            OrderStep::DeleteExistingLines => "delete_existing_lines",
            OrderStep::RecalculateTotal => "recalculate_total",
            OrderStep::PersistTotal => "persist_total",
            OrderStep::MarkDeleted => "mark_deleted",
            OrderStep::RemoveUserOrderIndex => "remove_user_order_index",
            OrderStep::Commit => "commit",
            OrderStep::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for OrderStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid item reference: {item_id}")]
    InvalidReference { item_id: i32 },

    #[error("Unknown user: {user_id}")]
    UnknownUser { user_id: i32 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transaction failure during {step}")]
    TransactionFailure {
        step: OrderStep,
        #[source]
        source: DbErr,
    },

    #[error("Store failure during {step}")]
    Store {
        step: OrderStep,
        #[source]
        source: DbErr,
    },

    #[error("ORM error")]
    OrmError(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps a store error raised while executing `step` inside a unit of work.
    pub fn at(step: OrderStep) -> impl FnOnce(DbErr) -> AppError {
        move |source| AppError::Store { step, source }
    }

    pub fn transaction(step: OrderStep) -> impl FnOnce(DbErr) -> AppError {
        move |source| AppError::TransactionFailure { step, source }
    }

    /// The step a transactional failure happened in, if any.
    pub fn step(&self) -> Option<OrderStep> {
        match self {
            AppError::TransactionFailure { step, .. } | AppError::Store { step, .. } => Some(*step),
            AppError::InvalidReference { .. } => Some(OrderStep::ResolvePrices),
            AppError::UnknownUser { .. } => Some(OrderStep::Validate),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound | AppError::UnknownUser { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TransactionFailure { .. }
            | AppError::Store { .. }
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                step: self.step().map(|s| s.as_str()),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_failures_report_their_step() {
        assert_eq!(
            AppError::InvalidReference { item_id: 3 }.step(),
            Some(OrderStep::ResolvePrices)
        );
        assert_eq!(
            AppError::UnknownUser { user_id: 9 }.step(),
            Some(OrderStep::Validate)
        );
        assert_eq!(
            AppError::at(OrderStep::InsertLineItems)(DbErr::Custom("boom".into())).step(),
            Some(OrderStep::InsertLineItems)
        );
        assert_eq!(AppError::NotFound.step(), None);
    }

    #[test]
    fn unknown_user_maps_to_not_found() {
        let response = AppError::UnknownUser { user_id: 9 }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::InvalidReference { item_id: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
