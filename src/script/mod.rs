// 脚本与表达式

mod expr;
mod expression;
mod listener;

pub use expr::{ExprError, ExprEvaluator, EXPR_LANGUAGE};
pub use expression::Expression;
pub use listener::ScriptTaskListener;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::variables::VariableScope;

/// 脚本执行结果
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptResult {
    pub value: Value,
    /// Top-level bindings in the order they were first assigned.
    pub bindings: Vec<(String, Value)>,
}

impl ScriptResult {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            bindings: Vec::new(),
        }
    }
}

/// 脚本语言求值器
pub trait ScriptEvaluator: Send + Sync {
    fn language(&self) -> &str;
    fn evaluate(&self, script: &str, scope: &dyn VariableScope) -> anyhow::Result<ScriptResult>;
}

/// 按语言标识注册的求值器集合
#[derive(Clone, Default)]
pub struct ScriptingEngines {
    evaluators: HashMap<String, Arc<dyn ScriptEvaluator>>,
}

impl ScriptingEngines {
    pub fn new() -> Self {
        Self {
            evaluators: HashMap::new(),
        }
    }

    /// Registry with the built-in `expr` language.
    pub fn with_defaults() -> Self {
        let mut engines = Self::new();
        engines.register(Arc::new(ExprEvaluator::new()));
        engines
    }

    pub fn register(&mut self, evaluator: Arc<dyn ScriptEvaluator>) {
        let language = evaluator.language().to_string();
        self.register_as(language, evaluator);
    }

    pub fn register_as(&mut self, language: impl Into<String>, evaluator: Arc<dyn ScriptEvaluator>) {
        let language = language.into();
        debug!(language = %language, "script evaluator registered");
        self.evaluators.insert(language, evaluator);
    }

    pub fn get(&self, language: &str) -> Option<Arc<dyn ScriptEvaluator>> {
        self.evaluators.get(language).map(Arc::clone)
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.evaluators.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Evaluates `script` in `language` against `scope`.
    ///
    /// With `auto_store_variables`, the script's top-level bindings are written back
    /// into the scope, only after the evaluation succeeded.
    pub fn evaluate(
        &self,
        script: &str,
        language: &str,
        scope: &mut dyn VariableScope,
        auto_store_variables: bool,
    ) -> Result<Value> {
        let evaluator = self
            .evaluators
            .get(language)
            .ok_or_else(|| EngineError::UnsupportedLanguage(language.to_string()))?;

        let result = evaluator
            .evaluate(script, &*scope)
            .map_err(|err| EngineError::ScriptEvaluation {
                language: language.to_string(),
                message: format!("{err:#}"),
            })?;

        if auto_store_variables {
            for (name, value) in result.bindings {
                scope.set_variable(&name, value);
            }
        }
        Ok(result.value)
    }
}
