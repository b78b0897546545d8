use serde_json::json;

use processflow::{
    EngineError, FormProperty, FormSubmission, ProcessDefinition, ProcessDefinitionBuilder,
    ProcessEngine, ProcessEngineConfiguration, ProcessInstanceStatus, SubmitOutcome,
    SubmittedFormData, TaskStatus, Variables,
};

fn leave_request() -> anyhow::Result<ProcessDefinition> {
    let mut builder = ProcessDefinitionBuilder::new("leave:1", "leave");
    builder
        .set_name("Leave request")
        .set_variable("kind", json!("annual"))
        .set_start_form(vec![
            FormProperty::string("employee").required(),
            FormProperty::long("days").with_default("1"),
            FormProperty::enumeration("kind", ["annual", "sick"]),
        ])
        .add_start_event("start")
        .add_user_task_with_form(
            "approve",
            "Approve",
            vec![
                FormProperty::boolean("approved")
                    .required()
                    .with_variable("managerApproved"),
                FormProperty::string("employee").read_only(),
                FormProperty::string("secret").with_default("hidden"),
            ],
        )
        .add_user_task("archive", "Archive")
        .add_end_event("end")
        .connect("start", "approve")
        .connect_when("approve", "archive", "managerApproved")
        .connect("approve", "end")
        .connect("archive", "end");
    Ok(builder.build()?)
}

fn engine() -> anyhow::Result<ProcessEngine> {
    Ok(ProcessEngineConfiguration::new()
        .with_definition(leave_request()?)
        .build()?)
}

fn form(entries: &[(&str, Option<&str>)]) -> SubmittedFormData {
    entries
        .iter()
        .map(|(id, value)| (*id, value.map(str::to_string)))
        .collect()
}

async fn start(engine: &ProcessEngine, business_key: Option<&str>) -> anyhow::Result<String> {
    let submission = FormSubmission::for_start(
        "leave:1",
        business_key.map(str::to_string),
        form(&[("employee", Some("kermit")), ("kind", Some("sick"))]),
    );
    match engine.form_service().submit_form(Some(submission)).await? {
        SubmitOutcome::Started(instance) => Ok(instance.id),
        SubmitOutcome::NoContent => anyhow::bail!("start form returned no content"),
    }
}

#[tokio::test]
async fn zero_or_both_ids_are_rejected_without_lookup() -> anyhow::Result<()> {
    let service = engine()?.form_service();

    let err = service.get_form_data(None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));

    // ids that do not exist still fail validation first, not lookup
    let err = service
        .get_form_data(Some("ghost-task"), Some("ghost-definition"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
    Ok(())
}

#[tokio::test]
async fn start_form_lists_readable_properties_with_defaults() -> anyhow::Result<()> {
    let service = engine()?.form_service();
    let form = service.get_form_data(None, Some("leave:1")).await?;

    assert_eq!(form.process_definition_id(), Some("leave:1"));
    assert_eq!(form.task_id(), None);
    let ids: Vec<_> = form
        .properties()
        .iter()
        .map(|field| field.property.id.as_str())
        .collect();
    assert_eq!(ids, vec!["employee", "days", "kind"]);
    assert_eq!(form.property("days").and_then(|f| f.value.as_deref()), Some("1"));
    assert_eq!(form.property("kind").and_then(|f| f.value.as_deref()), Some("annual"));
    assert_eq!(form.property("employee").and_then(|f| f.value.clone()), None);
    Ok(())
}

#[tokio::test]
async fn missing_form_is_not_found() -> anyhow::Result<()> {
    let engine = engine()?;
    let service = engine.form_service();

    let err = service
        .get_form_data(None, Some("no-such-definition"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "form data", .. }));

    let err = service.get_form_data(Some("no-such-task"), None).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    // the archive task has no form
    let id = start(&engine, None).await?;
    let task = engine.tasks_for_process(&id).await?.remove(0);
    service
        .submit_form(Some(FormSubmission::for_task(
            &task.id,
            form(&[("approved", Some("true"))]),
        )))
        .await?;
    let archive = engine
        .tasks_for_process(&id)
        .await?
        .into_iter()
        .find(|task| task.task_definition_key == "archive")
        .expect("archive task");
    let err = service.get_form_data(Some(&archive.id), None).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn start_submission_converts_and_keeps_business_key() -> anyhow::Result<()> {
    let engine = engine()?;

    let without_key = start(&engine, None).await?;
    let instance = engine.process_instance(&without_key).await?.expect("instance");
    assert_eq!(instance.business_key, None);
    assert_eq!(instance.variables.get("employee"), Some(&json!("kermit")));
    assert_eq!(instance.variables.get("days"), Some(&json!(1)));
    assert_eq!(instance.variables.get("kind"), Some(&json!("sick")));

    let with_key = start(&engine, Some("HR-42")).await?;
    let instance = engine.process_instance(&with_key).await?.expect("instance");
    assert_eq!(instance.business_key.as_deref(), Some("HR-42"));
    Ok(())
}

#[tokio::test]
async fn task_submission_completes_once_with_no_content() -> anyhow::Result<()> {
    let engine = engine()?;
    let id = start(&engine, None).await?;
    let task = engine.tasks_for_process(&id).await?.remove(0);

    let form_data = engine.form_service().get_form_data(Some(&task.id), None).await?;
    assert_eq!(form_data.task_id(), Some(task.id.as_str()));
    assert_eq!(
        form_data.property("employee").and_then(|f| f.value.as_deref()),
        Some("kermit")
    );
    assert_eq!(
        form_data.property("secret").and_then(|f| f.value.as_deref()),
        Some("hidden")
    );

    let submission = FormSubmission::for_task(&task.id, form(&[("approved", Some("false"))]));
    let outcome = engine
        .form_service()
        .submit_form(Some(submission.clone()))
        .await?;
    assert_eq!(outcome, SubmitOutcome::NoContent);

    let task = engine.task(&task.id).await?.expect("task");
    assert_eq!(task.status, TaskStatus::Completed);
    let instance = engine.process_instance(&id).await?.expect("instance");
    assert_eq!(instance.variables.get("managerApproved"), Some(&json!(false)));
    assert_eq!(instance.status, ProcessInstanceStatus::Completed);

    let err = engine
        .form_service()
        .submit_form(Some(submission))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn duplicate_properties_keep_the_last_value() -> anyhow::Result<()> {
    let engine = engine()?;
    let submission = FormSubmission::for_start(
        "leave:1",
        None,
        form(&[
            ("employee", Some("gonzo")),
            ("a", Some("1")),
            ("a", Some("2")),
        ]),
    );
    let SubmitOutcome::Started(instance) = engine.form_service().submit_form(Some(submission)).await?
    else {
        anyhow::bail!("expected a started instance");
    };
    assert_eq!(instance.variables.get("a"), Some(&json!("2")));
    Ok(())
}

#[tokio::test]
async fn invalid_submissions_leave_state_untouched() -> anyhow::Result<()> {
    let engine = engine()?;
    let service = engine.form_service();

    assert!(matches!(
        service.submit_form(None).await,
        Err(EngineError::InvalidArgument(_))
    ));
    assert!(matches!(
        service.submit_form(Some(FormSubmission::default())).await,
        Err(EngineError::InvalidArgument(_))
    ));

    // required start property missing
    let err = service
        .submit_form(Some(FormSubmission::for_start(
            "leave:1",
            None,
            form(&[("days", Some("3"))]),
        )))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("employee"));
    assert!(engine.process_instances().await?.is_empty());

    let id = start(&engine, None).await?;
    let task = engine.tasks_for_process(&id).await?.remove(0);
    for bad in [
        form(&[("approved", Some("maybe"))]),
        form(&[("approved", None)]),
        form(&[("approved", Some("true")), ("employee", Some("piggy"))]),
    ] {
        let err = service
            .submit_form(Some(FormSubmission::for_task(&task.id, bad)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    let task = engine.task(&task.id).await?.expect("task");
    assert_eq!(task.status, TaskStatus::Created);
    let instance = engine.process_instance(&id).await?.expect("instance");
    assert_eq!(instance.variables.get("employee"), Some(&json!("kermit")));
    assert!(!instance.variables.contains_key("managerApproved"));
    Ok(())
}

#[tokio::test]
async fn task_id_wins_when_both_ids_are_submitted() -> anyhow::Result<()> {
    let engine = engine()?;
    let id = start(&engine, None).await?;
    let task = engine.tasks_for_process(&id).await?.remove(0);

    let submission = FormSubmission {
        task_id: Some(task.id.clone()),
        process_definition_id: Some("leave:1".into()),
        business_key: None,
        properties: form(&[("approved", Some("true"))]),
    };
    let outcome = engine.form_service().submit_form(Some(submission)).await?;
    assert_eq!(outcome, SubmitOutcome::NoContent);
    assert_eq!(engine.process_instances().await?.len(), 1);

    let variables: Variables = engine
        .process_instance(&id)
        .await?
        .map(|instance| instance.variables)
        .unwrap_or_default();
    assert_eq!(variables.get("managerApproved"), Some(&json!(true)));
    Ok(())
}

#[tokio::test]
async fn raw_value_cannot_override_a_converted_variable() -> anyhow::Result<()> {
    let engine = engine()?;
    let id = start(&engine, None).await?;
    let task = engine.tasks_for_process(&id).await?.remove(0);

    let err = engine
        .form_service()
        .submit_form(Some(FormSubmission::for_task(
            &task.id,
            form(&[("approved", Some("false")), ("managerApproved", Some("yes"))]),
        )))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
    assert!(err.to_string().contains("managerApproved"));

    let task = engine.task(&task.id).await?.expect("task");
    assert_eq!(task.status, TaskStatus::Created);
    let instance = engine.process_instance(&id).await?.expect("instance");
    assert!(!instance.variables.contains_key("managerApproved"));
    Ok(())
}
