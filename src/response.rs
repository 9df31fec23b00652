use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

impl AppError {
    pub fn bad_request(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "AUTH_UNAUTHORIZED".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn upstream_timeout(message: &str) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            code: "UPSTREAM_TIMEOUT".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn upstream_unavailable(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: "UPSTREAM_UNAVAILABLE".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn service_unavailable(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            "Internal server error".to_string()
        };

        if self.is_operational {
            tracing::warn!(status = %self.status, code = %self.code, error = %self.message, "API error");
        } else {
            tracing::error!(status = %self.status, code = %self.code, error = %self.message, "Internal API error");
        }

        (
            self.status,
            Json(ErrorBody {
                success: false,
                code: self.code,
                message: exposed_message,
                trace_id: None,
            }),
        )
            .into_response()
    }
}

// StoreError mapping:
// - Validation -> 400 (caller input, message is safe to expose)
// - NotFound   -> 404
// - everything else -> 500 with the message redacted in IntoResponse
impl From<crate::store::StoreError> for AppError {
    fn from(value: crate::store::StoreError) -> Self {
        match &value {
            crate::store::StoreError::Validation(msg) => {
                AppError::bad_request("VALIDATION_ERROR", msg)
            }
            crate::store::StoreError::NotFound { entity, key } => {
                AppError::not_found(&format!("{entity} not found: {key}"))
            }
            _ => AppError::internal(&value.to_string()),
        }
    }
}

impl From<crate::services::translator::TranslatorError> for AppError {
    fn from(value: crate::services::translator::TranslatorError) -> Self {
        use crate::services::translator::TranslatorError;
        match &value {
            TranslatorError::Timeout => {
                AppError::upstream_timeout("Translation service timed out")
            }
            TranslatorError::Disabled => AppError::service_unavailable(
                "TRANSLATOR_DISABLED",
                "Translation service is disabled",
            ),
            TranslatorError::Network(_) | TranslatorError::Api { .. } => {
                tracing::error!(error = %value, "Translator upstream failure");
                AppError::upstream_unavailable("Translation service is unavailable")
            }
        }
    }
}

impl From<crate::services::translation_cache::CacheError> for AppError {
    fn from(value: crate::services::translation_cache::CacheError) -> Self {
        use crate::services::translation_cache::CacheError;
        match value {
            CacheError::Store(e) => e.into(),
            CacheError::Upstream(e) => e.into(),
            CacheError::EmptyResult(lang) => AppError::upstream_unavailable(&format!(
                "Translation service returned no entries for language {lang}"
            )),
        }
    }
}

impl From<crate::quiz::generator::GeneratorError> for AppError {
    fn from(value: crate::quiz::generator::GeneratorError) -> Self {
        use crate::quiz::generator::GeneratorError;
        match value {
            GeneratorError::Store(e) => e.into(),
            GeneratorError::Cache(e) => e.into(),
        }
    }
}

impl From<crate::quiz::evaluator::EvaluatorError> for AppError {
    fn from(value: crate::quiz::evaluator::EvaluatorError) -> Self {
        use crate::quiz::evaluator::EvaluatorError;
        match value {
            EvaluatorError::Store(e) => e.into(),
            EvaluatorError::AttemptNotFound(id) => {
                AppError::not_found(&format!("Quiz attempt not found: {id}"))
            }
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data,
        }),
    )
}

pub fn paginated<T: Serialize>(
    data: Vec<T>,
    total: u64,
    page: u64,
    per_page: u64,
) -> impl IntoResponse {
    let total_pages = if per_page > 0 {
        total.div_ceil(per_page)
    } else {
        0
    };
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: PaginatedResponse {
                data,
                total,
                page,
                per_page,
                total_pages,
            },
        }),
    )
}
