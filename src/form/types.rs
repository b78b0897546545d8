use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// 表单属性类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormPropertyType {
    #[default]
    String,
    Long,
    Double,
    Boolean,
    Enum,
}

impl FormPropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormPropertyType::String => "string",
            FormPropertyType::Long => "long",
            FormPropertyType::Double => "double",
            FormPropertyType::Boolean => "boolean",
            FormPropertyType::Enum => "enum",
        }
    }
}

/// 表单属性定义
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormProperty {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub property_type: FormPropertyType,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub readable: bool,
    #[serde(default = "default_true")]
    pub writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Process variable the value is stored under; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl FormProperty {
    pub fn new(id: impl Into<String>, property_type: FormPropertyType) -> Self {
        Self {
            id: id.into(),
            name: None,
            property_type,
            required: false,
            readable: true,
            writable: true,
            default_value: None,
            variable: None,
            enum_values: Vec::new(),
        }
    }

    pub fn string(id: impl Into<String>) -> Self {
        Self::new(id, FormPropertyType::String)
    }

    pub fn long(id: impl Into<String>) -> Self {
        Self::new(id, FormPropertyType::Long)
    }

    pub fn boolean(id: impl Into<String>) -> Self {
        Self::new(id, FormPropertyType::Boolean)
    }

    pub fn enumeration<I, S>(id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut property = Self::new(id, FormPropertyType::Enum);
        property.enum_values = values.into_iter().map(Into::into).collect();
        property
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn variable_name(&self) -> &str {
        self.variable.as_deref().unwrap_or(&self.id)
    }

    /// Converts a submitted string into the variable value for this property.
    pub fn convert(&self, raw: &str) -> Result<Value> {
        let invalid = |expected: &str| {
            EngineError::invalid(format!(
                "form property `{}` expects {expected}, got `{raw}`",
                self.id
            ))
        };

        match self.property_type {
            FormPropertyType::String => Ok(Value::String(raw.to_string())),
            FormPropertyType::Long => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| invalid("a long")),
            FormPropertyType::Double => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| invalid("a double")),
            FormPropertyType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(invalid("a boolean")),
            },
            FormPropertyType::Enum => {
                if self.enum_values.iter().any(|allowed| allowed == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(invalid(&format!("one of [{}]", self.enum_values.join(", "))))
                }
            }
        }
    }
}

/// 表单字段: 属性定义与当前值
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    #[serde(flatten)]
    pub property: FormProperty,
    #[serde(default)]
    pub value: Option<String>,
}

/// 任务或流程启动事件上的表单
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    task_id: Option<String>,
    process_definition_id: Option<String>,
    properties: Vec<FormField>,
}

impl FormDefinition {
    pub fn for_task(task_id: impl Into<String>, properties: Vec<FormField>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            process_definition_id: None,
            properties,
        }
    }

    pub fn for_start_event(process_definition_id: impl Into<String>, properties: Vec<FormField>) -> Self {
        Self {
            task_id: None,
            process_definition_id: Some(process_definition_id.into()),
            properties,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn process_definition_id(&self) -> Option<&str> {
        self.process_definition_id.as_deref()
    }

    pub fn properties(&self) -> &[FormField] {
        &self.properties
    }

    pub fn property(&self, id: &str) -> Option<&FormField> {
        self.properties.iter().find(|field| field.property.id == id)
    }
}

/// 提交的表单数据
///
/// Iteration follows first-submission order; a repeated id keeps its slot and
/// takes the later value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubmittedFormData {
    entries: Vec<(String, Option<String>)>,
}

impl SubmittedFormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: Option<String>) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == id)
    }

    /// `None` when the id was not submitted; `Some(None)` when it was submitted as null.
    pub fn get(&self, id: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, value)| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(id, value)| (id.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SubmittedFormData
where
    K: Into<String>,
    V: Into<Option<String>>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut data = Self::new();
        for (id, value) in iter {
            data.insert(id, value.into());
        }
        data
    }
}
