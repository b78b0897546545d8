use crate::error::{EngineError, Result};

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证定义、实例等标识符
    pub fn validate_identifier(what: &str, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(EngineError::invalid(format!("{what} cannot be empty")));
        }

        if id.len() > 255 {
            return Err(EngineError::invalid(format!(
                "{what} is too long (at most 255 characters)"
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
        {
            return Err(EngineError::invalid(format!(
                "{what} '{id}' contains invalid characters; use letters, digits, '_', '-', ':' or '.'"
            )));
        }

        Ok(())
    }

    /// 验证节点 ID
    pub fn validate_node_id(node_id: &str) -> Result<()> {
        if node_id.is_empty() {
            return Err(EngineError::invalid("node id cannot be empty"));
        }

        if !node_id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(EngineError::invalid(format!(
                "node id '{}' contains invalid characters; use letters, digits, '_' or '-'",
                node_id
            )));
        }

        Ok(())
    }

    /// 验证脚本语言标识
    pub fn validate_language_id(language: &str) -> Result<()> {
        if language.trim().is_empty() {
            return Err(EngineError::configuration("script language cannot be empty"));
        }
        if language.chars().any(char::is_whitespace) {
            return Err(EngineError::configuration(format!(
                "script language '{language}' cannot contain whitespace"
            )));
        }
        Ok(())
    }

    /// 验证最大步数
    pub fn validate_max_steps(max_steps: u32) -> Result<()> {
        if max_steps == 0 {
            return Err(EngineError::configuration("max_steps must be at least 1"));
        }
        Ok(())
    }
}
