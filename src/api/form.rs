use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{ApiResponse, ApiResult};
use crate::form::{
    FormDefinition, FormField, FormPropertyType, FormService, FormSubmission, SubmitOutcome,
    SubmittedFormData,
};
use crate::runtime::{ProcessInstance, ProcessInstanceStatus};
use crate::variables::Variables;

/// `GET /form/form-data` query parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDataQuery {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub process_definition_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestFormProperty {
    pub id: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// `POST /form/form-data` body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFormRequest {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub process_definition_id: Option<String>,
    #[serde(default)]
    pub business_key: Option<String>,
    #[serde(default)]
    pub properties: Option<Vec<RestFormProperty>>,
}

impl From<SubmitFormRequest> for FormSubmission {
    fn from(request: SubmitFormRequest) -> Self {
        let properties: SubmittedFormData = request
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|property| (property.id, property.value))
            .collect();
        FormSubmission {
            task_id: request.task_id,
            process_definition_id: request.process_definition_id,
            business_key: request.business_key,
            properties,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPropertyResponse {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub property_type: FormPropertyType,
    pub value: Option<String>,
    pub readable: bool,
    pub writable: bool,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl From<&FormField> for FormPropertyResponse {
    fn from(field: &FormField) -> Self {
        let property = &field.property;
        Self {
            id: property.id.clone(),
            name: property.name.clone(),
            property_type: property.property_type,
            value: field.value.clone(),
            readable: property.readable,
            writable: property.writable,
            required: property.required,
            enum_values: property.enum_values.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDataResponse {
    pub task_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub form_properties: Vec<FormPropertyResponse>,
}

impl From<&FormDefinition> for FormDataResponse {
    fn from(form: &FormDefinition) -> Self {
        Self {
            task_id: form.task_id().map(str::to_string),
            process_definition_id: form.process_definition_id().map(str::to_string),
            form_properties: form.properties().iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstanceResponse {
    pub id: String,
    pub process_definition_id: String,
    pub business_key: Option<String>,
    pub status: ProcessInstanceStatus,
    pub ended: bool,
    pub start_time: DateTime<Utc>,
    pub variables: Variables,
}

impl From<ProcessInstance> for ProcessInstanceResponse {
    fn from(instance: ProcessInstance) -> Self {
        Self {
            ended: instance.is_ended(),
            id: instance.id,
            process_definition_id: instance.process_definition_id,
            business_key: instance.business_key,
            status: instance.status,
            start_time: instance.start_time,
            variables: instance.variables,
        }
    }
}

/// 表单数据接口
#[derive(Clone)]
pub struct FormResource {
    service: FormService,
}

impl FormResource {
    pub fn new(service: FormService) -> Self {
        Self { service }
    }

    /// `GET /form/form-data`
    pub async fn get_form_data(&self, query: &FormDataQuery) -> ApiResult<FormDataResponse> {
        let form = self
            .service
            .get_form_data(query.task_id.as_deref(), query.process_definition_id.as_deref())
            .await?;
        Ok(ApiResponse::ok(FormDataResponse::from(&form)))
    }

    /// `POST /form/form-data`: 204 for a task form, 200 with the new instance for a start form.
    pub async fn submit_form(
        &self,
        request: Option<SubmitFormRequest>,
    ) -> ApiResult<ProcessInstanceResponse> {
        let outcome = self.service.submit_form(request.map(Into::into)).await?;
        Ok(match outcome {
            SubmitOutcome::NoContent => ApiResponse::no_content(),
            SubmitOutcome::Started(instance) => ApiResponse::ok(instance.into()),
        })
    }
}
