use serde_json::Value;
use tracing::{debug, warn};

use super::types::{FormDefinition, FormField, FormProperty, SubmittedFormData};
use crate::error::{EngineError, Result};
use crate::runtime::{ProcessEngine, ProcessInstance};
use crate::variables::{render_value, Variables};

/// 表单提交
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormSubmission {
    pub task_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub business_key: Option<String>,
    pub properties: SubmittedFormData,
}

impl FormSubmission {
    pub fn for_task(task_id: impl Into<String>, properties: SubmittedFormData) -> Self {
        Self {
            task_id: Some(task_id.into()),
            properties,
            ..Self::default()
        }
    }

    pub fn for_start(
        process_definition_id: impl Into<String>,
        business_key: Option<String>,
        properties: SubmittedFormData,
    ) -> Self {
        Self {
            process_definition_id: Some(process_definition_id.into()),
            business_key,
            properties,
            ..Self::default()
        }
    }
}

/// Result of a form submission.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// A task form completed its task.
    NoContent,
    /// A start form created this instance.
    Started(ProcessInstance),
}

/// 表单服务
#[derive(Clone)]
pub struct FormService {
    engine: ProcessEngine,
}

impl FormService {
    pub fn new(engine: ProcessEngine) -> Self {
        Self { engine }
    }

    /// Form of an open task or of a definition's start event; exactly one id must be given.
    pub async fn get_form_data(
        &self,
        task_id: Option<&str>,
        process_definition_id: Option<&str>,
    ) -> Result<FormDefinition> {
        match (task_id, process_definition_id) {
            (None, None) => Err(EngineError::invalid(
                "The taskId or processDefinitionId parameter has to be provided",
            )),
            (Some(_), Some(_)) => Err(EngineError::invalid(
                "Not both a taskId and a processDefinitionId parameter can be provided",
            )),
            (Some(task_id), None) => self.task_form_data(task_id).await,
            (None, Some(definition_id)) => self.start_form_data(definition_id),
        }
    }

    pub async fn task_form_data(&self, task_id: &str) -> Result<FormDefinition> {
        let task = match self.engine.task(task_id).await? {
            Some(task) if task.is_open() => task,
            _ => return Err(EngineError::not_found("form data", task_id)),
        };
        let definition = self
            .engine
            .definitions()
            .get(&task.process_definition_id)
            .ok_or_else(|| EngineError::not_found("form data", task_id))?;
        let properties = definition
            .user_task(&task.task_definition_key)
            .and_then(|user_task| user_task.form.as_ref())
            .ok_or_else(|| EngineError::not_found("form data", task_id))?;

        let process_variables = self
            .engine
            .process_instance(&task.process_instance_id)
            .await?
            .map(|instance| instance.variables)
            .unwrap_or_default();
        let fields = readable_fields(properties, |name| {
            task.variables
                .get(name)
                .or_else(|| process_variables.get(name))
                .cloned()
        });
        Ok(FormDefinition::for_task(task_id, fields))
    }

    pub fn start_form_data(&self, process_definition_id: &str) -> Result<FormDefinition> {
        let definition = self
            .engine
            .definitions()
            .get(process_definition_id)
            .ok_or_else(|| EngineError::not_found("form data", process_definition_id))?;
        let properties = definition
            .start_form
            .as_ref()
            .ok_or_else(|| EngineError::not_found("form data", process_definition_id))?;

        let fields = readable_fields(properties, |name| definition.variables.get(name).cloned());
        Ok(FormDefinition::for_start_event(process_definition_id, fields))
    }

    /// Routes a submission to task completion (when `task_id` is set) or process start.
    pub async fn submit_form(&self, submission: Option<FormSubmission>) -> Result<SubmitOutcome> {
        let submission = submission.ok_or_else(|| {
            EngineError::invalid("A request body was expected when executing the form submit.")
        })?;

        if let Some(task_id) = &submission.task_id {
            self.submit_task_form_data(task_id, &submission.properties)
                .await?;
            return Ok(SubmitOutcome::NoContent);
        }
        match &submission.process_definition_id {
            Some(definition_id) => {
                let instance = self
                    .submit_start_form_data(
                        definition_id,
                        submission.business_key.clone(),
                        &submission.properties,
                    )
                    .await?;
                Ok(SubmitOutcome::Started(instance))
            }
            None => Err(EngineError::invalid(
                "The taskId or processDefinitionId property has to be provided",
            )),
        }
    }

    pub async fn submit_task_form_data(
        &self,
        task_id: &str,
        properties: &SubmittedFormData,
    ) -> Result<()> {
        let task = match self.engine.task(task_id).await? {
            Some(task) if task.is_open() => task,
            _ => return Err(EngineError::not_found("task", task_id)),
        };
        let definition = self
            .engine
            .definitions()
            .require(&task.process_definition_id)?;
        let declared = definition
            .user_task(&task.task_definition_key)
            .and_then(|user_task| user_task.form.as_deref())
            .unwrap_or_default();

        let variables = submitted_variables(declared, properties)?;
        debug!(task_id, count = variables.len(), "task form submitted");
        self.engine.complete_task(task_id, variables).await
    }

    pub async fn submit_start_form_data(
        &self,
        process_definition_id: &str,
        business_key: Option<String>,
        properties: &SubmittedFormData,
    ) -> Result<ProcessInstance> {
        let definition = self.engine.definitions().require(process_definition_id)?;
        let declared = definition.start_form.as_deref().unwrap_or_default();

        let variables = submitted_variables(declared, properties)?;
        debug!(process_definition_id, count = variables.len(), "start form submitted");
        self.engine
            .start_process(process_definition_id, business_key, variables)
            .await
    }
}

fn readable_fields<F>(properties: &[FormProperty], lookup: F) -> Vec<FormField>
where
    F: Fn(&str) -> Option<Value>,
{
    properties
        .iter()
        .filter(|property| property.readable)
        .map(|property| {
            let value = lookup(property.variable_name())
                .as_ref()
                .and_then(render_value)
                .or_else(|| property.default_value.clone());
            FormField {
                property: property.clone(),
                value,
            }
        })
        .collect()
}

/// Validates submitted values against the declared properties and converts them
/// into variables. Nothing is returned unless every declared property passes.
pub(crate) fn submitted_variables(
    declared: &[FormProperty],
    submitted: &SubmittedFormData,
) -> Result<Variables> {
    let mut variables = Variables::new();

    for property in declared {
        match submitted.get(&property.id).flatten() {
            Some(raw) => {
                if !property.writable {
                    warn!(property = %property.id, "submitted value for read-only form property");
                    return Err(EngineError::invalid(format!(
                        "form property `{}` is not writable",
                        property.id
                    )));
                }
                variables.insert(property.variable_name().to_string(), property.convert(raw)?);
            }
            None if property.required => {
                warn!(property = %property.id, "required form property missing");
                return Err(EngineError::invalid(format!(
                    "form property `{}` is required",
                    property.id
                )));
            }
            None => {
                if let (true, Some(default)) = (property.writable, &property.default_value) {
                    variables.insert(
                        property.variable_name().to_string(),
                        property.convert(default)?,
                    );
                }
            }
        }
    }

    for (id, value) in submitted.iter() {
        if declared.iter().any(|property| property.id == id) {
            continue;
        }
        if let Some(owner) = declared.iter().find(|property| property.variable_name() == id) {
            warn!(property = %id, declared = %owner.id, "undeclared form property shadows a declared variable");
            return Err(EngineError::invalid(format!(
                "form property `{id}` collides with the variable of declared property `{}`",
                owner.id
            )));
        }
        let value = value.map_or(Value::Null, |raw| Value::String(raw.to_string()));
        variables.insert(id.to_string(), value);
    }
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn declared() -> Vec<FormProperty> {
        vec![
            FormProperty::long("days").required().with_variable("leaveDays"),
            FormProperty::enumeration("kind", ["annual", "sick"]).with_default("annual"),
            FormProperty::string("approver").read_only(),
        ]
    }

    #[test]
    fn converts_declared_and_passes_undeclared_through() {
        let submitted: SubmittedFormData =
            [("days", Some("3".to_string())), ("comment", None), ("note", Some("hi".to_string()))]
                .into_iter()
                .collect();
        let variables = submitted_variables(&declared(), &submitted).unwrap();

        assert_eq!(variables.get("leaveDays"), Some(&json!(3)));
        assert_eq!(variables.get("kind"), Some(&json!("annual")));
        assert_eq!(variables.get("comment"), Some(&Value::Null));
        assert_eq!(variables.get("note"), Some(&json!("hi")));
        assert!(!variables.contains_key("days"));
        assert!(!variables.contains_key("approver"));
    }

    #[test]
    fn null_counts_as_missing_for_required_properties() {
        let submitted: SubmittedFormData = [("days", None::<String>)].into_iter().collect();
        let err = submitted_variables(&declared(), &submitted).unwrap_err();
        assert!(err.to_string().contains("`days` is required"));
    }

    #[test]
    fn rejects_read_only_and_bad_enum_values() {
        let read_only: SubmittedFormData =
            [("days", "1"), ("approver", "kim")].into_iter().map(|(k, v)| (k, Some(v.to_string()))).collect();
        assert!(submitted_variables(&declared(), &read_only).is_err());

        let bad_enum: SubmittedFormData =
            [("days", "1"), ("kind", "unpaid")].into_iter().map(|(k, v)| (k, Some(v.to_string()))).collect();
        assert!(matches!(
            submitted_variables(&declared(), &bad_enum),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn undeclared_property_cannot_shadow_a_declared_variable() {
        let submitted: SubmittedFormData = [("days", "2"), ("leaveDays", "forever")]
            .into_iter()
            .map(|(k, v)| (k, Some(v.to_string())))
            .collect();
        let err = submitted_variables(&declared(), &submitted).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert!(err.to_string().contains("`leaveDays`"));
    }
}
