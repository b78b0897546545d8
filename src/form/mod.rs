// 表单数据

mod service;
mod types;

pub use service::{FormService, FormSubmission, SubmitOutcome};
pub use types::{
    FormDefinition, FormField, FormProperty, FormPropertyType, SubmittedFormData,
};
