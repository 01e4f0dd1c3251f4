//! Success envelope shared by the JSON endpoints.
//!
//! Mini-program clients check `code == 0` before reading `data`, so every
//! successful JSON response carries the same wrapper.

use actix_web::HttpResponse;
use serde::Serialize;
use utoipa::ToSchema;

const SUCCESS_CODE: i32 = 0;
const SUCCESS_MESSAGE: &str = "success";

/// `{code: 0, message: "success", data?}` wrapper.
#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl Envelope<()> {
    pub fn empty() -> Self {
        Self {
            code: SUCCESS_CODE,
            message: SUCCESS_MESSAGE,
            data: None,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn with_data(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: SUCCESS_MESSAGE,
            data: Some(data),
        }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}
