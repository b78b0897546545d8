use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;

/// 用户信息存储 trait
///
/// Values are opaque strings; `set_info(.., None)` removes the entry.
#[async_trait]
pub trait UserInfoStore: Send + Sync {
    async fn create_user(&self, user_id: &str) -> Result<()>;
    async fn user_exists(&self, user_id: &str) -> Result<bool>;
    async fn get_info(&self, user_id: &str, key: &str) -> Result<Option<String>>;
    async fn set_info(&self, user_id: &str, key: &str, value: Option<String>) -> Result<()>;
    async fn info_keys(&self, user_id: &str) -> Result<Vec<String>>;
}

/// 内存用户信息存储
#[derive(Default)]
pub struct MemoryUserInfoStore {
    users: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryUserInfoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserInfoStore for MemoryUserInfoStore {
    async fn create_user(&self, user_id: &str) -> Result<()> {
        self.users.write().entry(user_id.to_string()).or_default();
        Ok(())
    }

    async fn user_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.read().contains_key(user_id))
    }

    async fn get_info(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .and_then(|info| info.get(key))
            .cloned())
    }

    async fn set_info(&self, user_id: &str, key: &str, value: Option<String>) -> Result<()> {
        let mut users = self.users.write();
        let info = users.entry(user_id.to_string()).or_default();
        match value {
            Some(value) => {
                info.insert(key.to_string(), value);
            }
            None => {
                info.remove(key);
            }
        }
        Ok(())
    }

    async fn info_keys(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .users
            .read()
            .get(user_id)
            .map(|info| info.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(feature = "redis-store")]
pub mod redis {
    use super::*;
    use crate::error::EngineError;
    use anyhow::Context;
    use ::redis::aio::MultiplexedConnection;
    use ::redis::AsyncCommands;

    const USERS_KEY: &str = "processflow:users";

    /// Redis 用户信息存储：用户集合 + 每个用户一个 hash
    pub struct RedisUserInfoStore {
        client: ::redis::Client,
    }

    impl RedisUserInfoStore {
        pub fn new(client: ::redis::Client) -> Self {
            Self { client }
        }

        pub fn open(url: &str) -> Result<Self> {
            let client = ::redis::Client::open(url)
                .with_context(|| format!("invalid redis url `{url}`"))?;
            Ok(Self::new(client))
        }

        async fn connection(&self) -> Result<MultiplexedConnection> {
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(store_error)
        }
    }

    fn info_key(user_id: &str) -> String {
        format!("processflow:user:{user_id}:info")
    }

    fn store_error(err: ::redis::RedisError) -> EngineError {
        EngineError::Other(anyhow::Error::new(err).context("user info store"))
    }

    #[async_trait]
    impl UserInfoStore for RedisUserInfoStore {
        async fn create_user(&self, user_id: &str) -> Result<()> {
            let mut conn = self.connection().await?;
            let _: () = conn.sadd(USERS_KEY, user_id).await.map_err(store_error)?;
            Ok(())
        }

        async fn user_exists(&self, user_id: &str) -> Result<bool> {
            let mut conn = self.connection().await?;
            conn.sismember(USERS_KEY, user_id)
                .await
                .map_err(store_error)
        }

        async fn get_info(&self, user_id: &str, key: &str) -> Result<Option<String>> {
            let mut conn = self.connection().await?;
            conn.hget(info_key(user_id), key)
                .await
                .map_err(store_error)
        }

        async fn set_info(&self, user_id: &str, key: &str, value: Option<String>) -> Result<()> {
            let mut conn = self.connection().await?;
            match value {
                Some(value) => {
                    let _: () = conn
                        .hset(info_key(user_id), key, value)
                        .await
                        .map_err(store_error)?;
                }
                None => {
                    let _: () = conn
                        .hdel(info_key(user_id), key)
                        .await
                        .map_err(store_error)?;
                }
            }
            Ok(())
        }

        async fn info_keys(&self, user_id: &str) -> Result<Vec<String>> {
            let mut conn = self.connection().await?;
            let mut keys: Vec<String> = conn
                .hkeys(info_key(user_id))
                .await
                .map_err(store_error)?;
            keys.sort();
            Ok(keys)
        }
    }
}
