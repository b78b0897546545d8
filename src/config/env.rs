use crate::error::{EngineError, Result};
use std::env;
use std::str::FromStr;

pub const DEBUG_ENV: &str = "PROCESSFLOW_DEBUG";
pub const ENGINE_NAME_ENV: &str = "PROCESSFLOW_ENGINE_NAME";
pub const DEFAULT_LANGUAGE_ENV: &str = "PROCESSFLOW_DEFAULT_SCRIPT_LANGUAGE";
pub const MAX_STEPS_ENV: &str = "PROCESSFLOW_MAX_STEPS";
pub const EVENTS_ENABLED_ENV: &str = "PROCESSFLOW_EVENTS_ENABLED";

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            EngineError::configuration(format!("environment variable '{key}' is not set"))
        })
    }

    /// 获取可选的环境变量
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.trim().is_empty())
    }

    /// 解析可选的环境变量
    pub fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>> {
        match Self::get_env_optional(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                EngineError::configuration(format!(
                    "environment variable '{key}' has an invalid value '{raw}'"
                ))
            }),
        }
    }

    /// 检查是否启用调试模式
    pub fn is_debug_mode() -> bool {
        env::var(DEBUG_ENV).is_ok()
    }
}

/// 宏：简化环境变量获取
#[macro_export]
macro_rules! env_var {
    ($key:expr) => {
        $crate::config::EnvConfig::get_env($key)
    };
}
