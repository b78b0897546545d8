use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResponse, ApiResult};
use crate::identity::IdentityService;

/// `PUT /identity/users/{userId}/info/{key}` body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoResponse {
    pub key: String,
    pub value: String,
    pub user_id: String,
}

/// 用户信息接口
#[derive(Clone)]
pub struct UserInfoResource {
    service: IdentityService,
}

impl UserInfoResource {
    pub fn new(service: IdentityService) -> Self {
        Self { service }
    }

    /// `GET /identity/users/{userId}/info/{key}`
    pub async fn get_user_info(&self, user_id: &str, key: &str) -> ApiResult<UserInfoResponse> {
        let value = self.service.require_user_info(user_id, key).await?;
        Ok(ApiResponse::ok(UserInfoResponse {
            key: key.to_string(),
            value,
            user_id: user_id.to_string(),
        }))
    }

    /// `PUT /identity/users/{userId}/info/{key}`; the entry must already exist.
    pub async fn set_user_info(
        &self,
        user_id: &str,
        key: &str,
        request: Option<UserInfoRequest>,
    ) -> ApiResult<UserInfoResponse> {
        self.service.require_user_info(user_id, key).await?;

        let request = request
            .ok_or_else(|| ApiError::bad_request("A request body was expected."))?;
        let value = request
            .value
            .ok_or_else(|| ApiError::bad_request("The value cannot be null."))?;
        if request.key.as_deref().is_some_and(|body_key| body_key != key) {
            return Err(ApiError::bad_request(
                "Key provided in request body doesn't match the key in the resource URL.",
            ));
        }

        self.service
            .set_user_info(user_id, key, value.clone())
            .await?;
        Ok(ApiResponse::ok(UserInfoResponse {
            key: key.to_string(),
            value,
            user_id: user_id.to_string(),
        }))
    }

    /// `DELETE /identity/users/{userId}/info/{key}`
    pub async fn delete_user_info(&self, user_id: &str, key: &str) -> ApiResult<()> {
        self.service.delete_user_info(user_id, key).await?;
        Ok(ApiResponse::no_content())
    }
}
