use tracing::debug;

use super::Expression;
use crate::definition::ScriptListenerDef;
use crate::error::{EngineError, Result};
use crate::runtime::{DelegateTask, TaskListener};
use crate::variables::VariableScope;

/// 脚本任务监听器
///
/// `script` and `language` are resolved against the task at notification time.
/// When `result_variable` is set, the script's value is stored under it whether
/// or not `auto_store_variables` is on.
#[derive(Clone, Debug, Default)]
pub struct ScriptTaskListener {
    pub script: Option<Expression>,
    pub language: Option<Expression>,
    pub result_variable: Option<Expression>,
    pub auto_store_variables: bool,
}

impl ScriptTaskListener {
    pub fn new(script: impl Into<Expression>, language: impl Into<Expression>) -> Self {
        Self {
            script: Some(script.into()),
            language: Some(language.into()),
            ..Self::default()
        }
    }

    pub fn with_result_variable(mut self, name: impl Into<Expression>) -> Self {
        self.result_variable = Some(name.into());
        self
    }

    pub fn with_auto_store_variables(mut self, auto_store: bool) -> Self {
        self.auto_store_variables = auto_store;
        self
    }
}

impl From<&ScriptListenerDef> for ScriptTaskListener {
    fn from(def: &ScriptListenerDef) -> Self {
        Self {
            script: def.script.as_deref().map(Expression::from),
            language: def.language.as_deref().map(Expression::from),
            result_variable: def.result_variable.as_deref().map(Expression::from),
            auto_store_variables: def.auto_store_variables,
        }
    }
}

fn required_field(
    field: &Option<Expression>,
    name: &str,
    scope: &dyn VariableScope,
) -> Result<String> {
    field
        .as_ref()
        .and_then(|expression| expression.resolve(scope))
        .ok_or_else(|| {
            EngineError::configuration(format!(
                "the field '{name}' should be set on the task listener"
            ))
        })
}

impl TaskListener for ScriptTaskListener {
    fn notify(&self, task: &mut DelegateTask<'_>) -> Result<()> {
        let script = required_field(&self.script, "script", &*task)?;
        let language = required_field(&self.language, "language", &*task)?;
        let result_variable = match &self.result_variable {
            Some(expression) => Some(expression.resolve(&*task).ok_or_else(|| {
                EngineError::configuration(format!(
                    "the field 'resultVariable' could not be resolved from `{expression}`"
                ))
            })?),
            None => None,
        };

        debug!(task_id = %task.id(), language = %language, "running script task listener");
        let scripting = task.scripting();
        let value = scripting.evaluate(&script, &language, &mut *task, self.auto_store_variables)?;

        if let Some(name) = result_variable {
            task.set_variable(&name, value);
        }
        Ok(())
    }
}
