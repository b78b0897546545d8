use minijinja::{Environment, UndefinedBehavior, Value as JinjaValue};
use serde_json::Value;
use thiserror::Error;

use super::{ScriptEvaluator, ScriptResult};
use crate::variables::VariableScope;

pub const EXPR_LANGUAGE: &str = "expr";

/// 内置 `expr` 语言的错误
#[derive(Debug, Error)]
pub enum ExprError {
    #[error(transparent)]
    Expression(#[from] minijinja::Error),
    #[error("`{0}` refers to an unknown variable")]
    Undefined(String),
    #[error("result is not representable as JSON: {0}")]
    Conversion(#[from] serde_json::Error),
}

/// 内置表达式语言
///
/// Each statement is a minijinja expression; statements are separated by `;`
/// or newlines. `name = expression` binds a top-level variable, and the value
/// of the script is the value of its last statement. Unknown names fail.
pub struct ExprEvaluator {
    env: Environment<'static>,
}

impl ExprEvaluator {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    /// Runs `script` against `scope` without touching it.
    pub fn run(&self, script: &str, scope: &dyn VariableScope) -> Result<ScriptResult, ExprError> {
        let mut bindings: Vec<(String, Value)> = Vec::new();
        let mut last = Value::Null;

        for statement in statements(script) {
            let (target, source) = match assignment(statement) {
                Some((name, source)) => (Some(name), source),
                None => (None, statement),
            };
            let expression = self.env.compile_expression(source)?;

            let mut context = scope.snapshot();
            context.extend(bindings.iter().cloned());
            let value = expression.eval(JinjaValue::from_serialize(&context))?;
            if value.is_undefined() {
                return Err(ExprError::Undefined(source.trim().to_string()));
            }
            let value = serde_json::to_value(&value)?;

            if let Some(name) = target {
                match bindings.iter_mut().find(|(bound, _)| bound == name) {
                    Some(slot) => slot.1 = value.clone(),
                    None => bindings.push((name.to_string(), value.clone())),
                }
            }
            last = value;
        }

        Ok(ScriptResult {
            value: last,
            bindings,
        })
    }
}

impl Default for ExprEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEvaluator for ExprEvaluator {
    fn language(&self) -> &str {
        EXPR_LANGUAGE
    }

    fn evaluate(&self, script: &str, scope: &dyn VariableScope) -> anyhow::Result<ScriptResult> {
        Ok(self.run(script, scope)?)
    }
}

/// Splits on `;` and newlines outside string literals; blank statements are dropped.
fn statements(script: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;

    for (offset, ch) in script.char_indices() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, ';' | '\n') => {
                parts.push(&script[start..offset]);
                start = offset + 1;
            }
            (None, _) => {}
        }
    }
    parts.push(&script[start..]);
    parts.retain(|part| !part.trim().is_empty());
    parts
}

/// `name = expression`, where `=` is not part of `==`.
fn assignment(statement: &str) -> Option<(&str, &str)> {
    let (target, source) = statement.split_once('=')?;
    if source.starts_with('=') {
        return None;
    }
    let target = target.trim();
    let mut chars = target.chars();
    let head = chars.next()?;
    let is_name = (head.is_ascii_alphabetic() || head == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_name.then_some((target, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::Variables;
    use serde_json::json;

    fn eval(script: &str) -> Result<Value, ExprError> {
        ExprEvaluator::new()
            .run(script, &Variables::new())
            .map(|result| result.value)
    }

    #[test]
    fn arithmetic_respects_precedence() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), json!(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), json!(9));
        assert_eq!(eval("10 % 4 - -2").unwrap(), json!(4));
        assert_eq!(eval("7 / 2").unwrap(), json!(3.5));
        assert_eq!(eval("7 // 2").unwrap(), json!(3));
    }

    #[test]
    fn tilde_concatenates_any_value() {
        assert_eq!(eval("'n=' ~ 3").unwrap(), json!("n=3"));
        assert_eq!(eval("\"a;b\" ~ true").unwrap(), json!("a;btrue"));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval("1 < 2 and 2 <= 2").unwrap(), json!(true));
        assert_eq!(eval("'b' > 'a' or false").unwrap(), json!(true));
        assert_eq!(eval("not (1 != 1)").unwrap(), json!(true));
    }

    #[test]
    fn type_mismatch_is_reported() {
        assert!(eval("1 - 'a'").is_err());
    }

    #[test]
    fn assignments_become_bindings_in_order() {
        let mut vars = Variables::new();
        vars.insert("x".into(), json!(1));
        let result = ExprEvaluator::new()
            .run("b = x + 1\na = b * 10; b = 5", &vars)
            .unwrap();
        assert_eq!(result.value, json!(5));
        assert_eq!(
            result.bindings,
            vec![("b".to_string(), json!(5)), ("a".to_string(), json!(20))]
        );
    }

    #[test]
    fn equality_is_not_an_assignment() {
        let mut vars = Variables::new();
        vars.insert("flag".into(), json!(true));
        let result = ExprEvaluator::new().run("flag == true", &vars).unwrap();
        assert_eq!(result.value, json!(true));
        assert!(result.bindings.is_empty());
    }

    #[test]
    fn unknown_variable_fails() {
        assert!(matches!(eval("missing"), Err(ExprError::Undefined(name)) if name == "missing"));
        assert!(eval("missing + 1").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected_without_overflowing() {
        let script = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert!(matches!(eval(&script), Err(ExprError::Expression(_))));
    }
}
