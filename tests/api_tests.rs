use serde_json::json;

use processflow::api::{
    FormDataQuery, FormResource, RestFormProperty, SubmitFormRequest, UserInfoRequest,
    UserInfoResource,
};
use processflow::{FormProperty, ProcessDefinitionBuilder, ProcessEngine, ProcessEngineConfiguration};

fn engine() -> anyhow::Result<ProcessEngine> {
    let mut builder = ProcessDefinitionBuilder::new("invoice", "invoice");
    builder
        .set_start_form(vec![FormProperty::long("amount").required()])
        .add_start_event("start")
        .add_user_task_with_form("pay", "Pay", vec![FormProperty::string("reference")])
        .add_end_event("end")
        .connect("start", "pay")
        .connect("pay", "end");
    Ok(ProcessEngineConfiguration::new()
        .with_definition(builder.build()?)
        .build()?)
}

fn property(id: &str, value: Option<&str>) -> RestFormProperty {
    RestFormProperty {
        id: id.to_string(),
        value: value.map(str::to_string),
    }
}

#[tokio::test]
async fn form_data_query_statuses() -> anyhow::Result<()> {
    let resource = FormResource::new(engine()?.form_service());

    let neither = resource.get_form_data(&FormDataQuery::default()).await;
    assert_eq!(neither.unwrap_err().status, 400);

    let both = resource
        .get_form_data(&FormDataQuery {
            task_id: Some("t".into()),
            process_definition_id: Some("invoice".into()),
        })
        .await;
    assert_eq!(both.unwrap_err().status, 400);

    let missing = resource
        .get_form_data(&FormDataQuery {
            task_id: None,
            process_definition_id: Some("nope".into()),
        })
        .await;
    assert_eq!(missing.unwrap_err().status, 404);

    let found = resource
        .get_form_data(&FormDataQuery {
            task_id: None,
            process_definition_id: Some("invoice".into()),
        })
        .await
        .map_err(anyhow::Error::new)?;
    assert_eq!(found.status, 200);
    let body = serde_json::to_value(found.body.expect("form body"))?;
    assert_eq!(body["processDefinitionId"], json!("invoice"));
    assert_eq!(body["formProperties"][0]["id"], json!("amount"));
    assert_eq!(body["formProperties"][0]["type"], json!("long"));
    assert_eq!(body["formProperties"][0]["required"], json!(true));
    Ok(())
}

#[tokio::test]
async fn submit_form_statuses() -> anyhow::Result<()> {
    let engine = engine()?;
    let resource = FormResource::new(engine.form_service());

    assert_eq!(resource.submit_form(None).await.unwrap_err().status, 400);
    assert_eq!(
        resource
            .submit_form(Some(SubmitFormRequest::default()))
            .await
            .unwrap_err()
            .status,
        400
    );

    let request: SubmitFormRequest = serde_json::from_value(json!({
        "processDefinitionId": "invoice",
        "businessKey": "INV-1",
        "properties": [{ "id": "amount", "value": "120" }]
    }))?;
    let started = resource
        .submit_form(Some(request))
        .await
        .map_err(anyhow::Error::new)?;
    assert_eq!(started.status, 200);
    let instance = started.body.expect("instance body");
    assert_eq!(instance.business_key.as_deref(), Some("INV-1"));
    assert_eq!(instance.variables.get("amount"), Some(&json!(120)));
    assert!(!instance.ended);

    let task = engine.tasks_for_process(&instance.id).await?.remove(0);
    let completed = resource
        .submit_form(Some(SubmitFormRequest {
            task_id: Some(task.id.clone()),
            properties: Some(vec![property("reference", Some("wire-9"))]),
            ..SubmitFormRequest::default()
        }))
        .await
        .map_err(anyhow::Error::new)?;
    assert_eq!(completed.status, 204);
    assert!(completed.body.is_none());
    Ok(())
}

#[tokio::test]
async fn user_info_statuses() -> anyhow::Result<()> {
    let engine = engine()?;
    let identity = engine.identity_service();
    identity.create_user("kermit").await?;
    identity
        .put_user_info("kermit", "email", "kermit@muppets.test".into())
        .await?;
    let resource = UserInfoResource::new(identity);

    let found = resource
        .get_user_info("kermit", "email")
        .await
        .map_err(anyhow::Error::new)?;
    let body = serde_json::to_value(found.body.expect("body"))?;
    assert_eq!(
        body,
        json!({ "key": "email", "value": "kermit@muppets.test", "userId": "kermit" })
    );
    assert_eq!(resource.get_user_info("kermit", "phone").await.unwrap_err().status, 404);
    assert_eq!(resource.get_user_info("nobody", "email").await.unwrap_err().status, 404);

    let null_value = UserInfoRequest {
        key: None,
        value: None,
    };
    assert_eq!(
        resource
            .set_user_info("kermit", "email", Some(null_value))
            .await
            .unwrap_err()
            .status,
        400
    );
    let wrong_key = UserInfoRequest {
        key: Some("phone".into()),
        value: Some("x".into()),
    };
    assert_eq!(
        resource
            .set_user_info("kermit", "email", Some(wrong_key))
            .await
            .unwrap_err()
            .status,
        400
    );
    let unknown_entry = UserInfoRequest {
        key: None,
        value: Some("555".into()),
    };
    assert_eq!(
        resource
            .set_user_info("kermit", "phone", Some(unknown_entry))
            .await
            .unwrap_err()
            .status,
        404
    );

    let updated = resource
        .set_user_info(
            "kermit",
            "email",
            Some(UserInfoRequest {
                key: Some("email".into()),
                value: Some("frog@muppets.test".into()),
            }),
        )
        .await
        .map_err(anyhow::Error::new)?;
    assert_eq!(updated.status, 200);
    assert_eq!(
        updated.body.map(|body| body.value).as_deref(),
        Some("frog@muppets.test")
    );

    let deleted = resource
        .delete_user_info("kermit", "email")
        .await
        .map_err(anyhow::Error::new)?;
    assert_eq!(deleted.status, 204);
    assert_eq!(resource.delete_user_info("kermit", "email").await.unwrap_err().status, 404);
    Ok(())
}
