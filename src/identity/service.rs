use std::sync::Arc;

use tracing::{debug, warn};

use super::store::UserInfoStore;
use crate::error::{EngineError, Result};
use crate::utils::validation::ConfigValidator;

/// 用户信息服务
///
/// Updates and deletes read the entry first and fail with `NotFound` when it
/// does not exist; `put_user_info` is the unchecked upsert.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn UserInfoStore>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn UserInfoStore>) -> Self {
        Self { store }
    }

    pub async fn create_user(&self, user_id: &str) -> Result<()> {
        ConfigValidator::validate_identifier("user id", user_id)?;
        self.store.create_user(user_id).await?;
        debug!(user_id, "user created");
        Ok(())
    }

    pub async fn user_exists(&self, user_id: &str) -> Result<bool> {
        self.store.user_exists(user_id).await
    }

    pub async fn user_info(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        self.require_user(user_id).await?;
        self.store.get_info(user_id, key).await
    }

    /// Current value of an entry that must exist.
    pub async fn require_user_info(&self, user_id: &str, key: &str) -> Result<String> {
        self.user_info(user_id, key).await?.ok_or_else(|| {
            warn!(user_id, key, "user info entry not found");
            EngineError::not_found("user info", format!("{user_id}/{key}"))
        })
    }

    pub async fn put_user_info(&self, user_id: &str, key: &str, value: String) -> Result<()> {
        self.require_user(user_id).await?;
        self.store.set_info(user_id, key, Some(value)).await
    }

    pub async fn set_user_info(&self, user_id: &str, key: &str, value: String) -> Result<()> {
        self.require_user_info(user_id, key).await?;
        self.store.set_info(user_id, key, Some(value)).await?;
        debug!(user_id, key, "user info updated");
        Ok(())
    }

    pub async fn delete_user_info(&self, user_id: &str, key: &str) -> Result<()> {
        self.require_user_info(user_id, key).await?;
        self.store.set_info(user_id, key, None).await?;
        debug!(user_id, key, "user info deleted");
        Ok(())
    }

    pub async fn user_info_keys(&self, user_id: &str) -> Result<Vec<String>> {
        self.require_user(user_id).await?;
        self.store.info_keys(user_id).await
    }

    async fn require_user(&self, user_id: &str) -> Result<()> {
        if self.store.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(EngineError::not_found("user", user_id))
        }
    }
}
