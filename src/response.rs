use serde::Serialize;
use utoipa::ToSchema;

/// Pagination metadata attached to list responses.
#[derive(Debug, Serialize, ToSchema, Clone, Default)]
pub struct Meta {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub total: Option<u64>,
}

impl Meta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Envelope shared by every JSON response, successful or not.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}
