// 用户信息

mod service;
mod store;

pub use service::IdentityService;
#[cfg(feature = "redis-store")]
pub use store::redis::RedisUserInfoStore;
pub use store::{MemoryUserInfoStore, UserInfoStore};
