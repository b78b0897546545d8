use std::fmt;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior, Value as JinjaValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::variables::VariableScope;

/// 监听器字段表达式: 固定文本，或包含 `${name}` 占位符的模板
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression {
    text: String,
}

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_template(&self) -> bool {
        self.text.contains("${")
    }

    /// Resolves the expression against `scope`.
    ///
    /// Returns `None` when a referenced variable is absent or null, or the
    /// template does not render.
    pub fn resolve(&self, scope: &dyn VariableScope) -> Option<String> {
        if !self.is_template() {
            return Some(self.text.clone());
        }

        let mut defined = scope.snapshot();
        defined.retain(|_, value| !value.is_null());

        template_environment()
            .and_then(|env| env.render_str(&self.text, JinjaValue::from_serialize(&defined)))
            .map_err(|err| debug!(expression = %self.text, error = %err, "expression did not resolve"))
            .ok()
    }
}

/// `${ ... }` placeholders, undefined names are errors.
fn template_environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_syntax(
        SyntaxConfig::builder()
            .variable_delimiters("${", "}")
            .build()?,
    );
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Ok(env)
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
