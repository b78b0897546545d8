//! Framework-free resource layer: request validation and status mapping for
//! the form and user-info endpoints. An HTTP server mounts these handlers and
//! serializes `ApiResponse` / `ApiError` however it likes.

pub mod error;
pub mod form;
pub mod identity;

pub use error::{ApiError, ApiResponse, ApiResult};
pub use form::{
    FormDataQuery, FormDataResponse, FormPropertyResponse, FormResource, ProcessInstanceResponse,
    RestFormProperty, SubmitFormRequest,
};
pub use identity::{UserInfoRequest, UserInfoResource, UserInfoResponse};
