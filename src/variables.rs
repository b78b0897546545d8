use std::collections::HashMap;

use serde_json::Value;

/// 变量映射
pub type Variables = HashMap<String, Value>;

/// 变量作用域，脚本与表达式通过它读写变量
pub trait VariableScope {
    fn variable(&self, name: &str) -> Option<Value>;
    fn set_variable(&mut self, name: &str, value: Value);
    /// Every visible variable, with inner scopes shadowing outer ones.
    fn snapshot(&self) -> Variables;
    fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }
}

impl VariableScope for Variables {
    fn variable(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn set_variable(&mut self, name: &str, value: Value) {
        self.insert(name.to_string(), value);
    }

    fn snapshot(&self) -> Variables {
        self.clone()
    }
}

/// Renders a variable the way form fields show it.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
