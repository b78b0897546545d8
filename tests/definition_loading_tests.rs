use std::fs;

use serde_json::json;

use processflow::{
    DefinitionRepository, EngineError, EngineSettings, FlowNodeKind, ProcessEngineConfiguration,
    ProcessInstanceStatus, Variables,
};

const EXPENSE: &str = r#"
{
  "id": "expense:1",
  "key": "expense",
  "name": "Expense claim",
  "variables": { "currency": "EUR" },
  "startForm": [
    { "id": "amount", "type": "long", "required": true }
  ],
  "nodes": [
    { "id": "start", "type": "start" },
    { "id": "check", "type": "scriptTask", "script": "large = amount > 100", "autoStoreVariables": true },
    {
      "id": "approve",
      "type": "userTask",
      "name": "Approve claim",
      "form": [{ "id": "comment" }],
      "listeners": [
        {
          "event": "complete",
          "implementation": {
            "kind": "script",
            "script": "'approved ' ~ amount ~ ' ' ~ currency",
            "language": "expr",
            "resultVariable": "summary"
          }
        }
      ]
    },
    { "id": "end", "type": "end" }
  ],
  "flows": [
    { "from": "start", "to": "check" },
    { "from": "check", "to": "approve", "condition": "large" },
    { "from": "check", "to": "end" },
    { "from": "approve", "to": "end" }
  ]
}
"#;

#[test]
fn json_definitions_deserialize_into_typed_nodes() -> anyhow::Result<()> {
    let repository = DefinitionRepository::new();
    let deployed = repository.deploy_json(EXPENSE)?;
    assert_eq!(deployed.len(), 1);

    let definition = repository.require("expense:1")?;
    assert_eq!(definition.version, 1);
    assert!(matches!(
        definition.node("check").map(|node| &node.kind),
        Some(FlowNodeKind::ScriptTask(script)) if script.language == "expr" && script.auto_store_variables
    ));
    let approve = definition.user_task("approve").expect("user task");
    assert_eq!(approve.listeners.len(), 1);
    assert_eq!(
        repository.latest_by_key("expense").map(|d| d.id.clone()),
        Some("expense:1".to_string())
    );
    Ok(())
}

#[test]
fn invalid_documents_deploy_nothing() {
    let repository = DefinitionRepository::new();

    assert!(matches!(
        repository.deploy_json("{ not json"),
        Err(EngineError::InvalidArgument(_))
    ));

    let batch = json!([
        {
            "id": "ok", "key": "ok",
            "nodes": [{ "id": "s", "type": "start" }, { "id": "e", "type": "end" }],
            "flows": [{ "from": "s", "to": "e" }]
        },
        {
            "id": "broken", "key": "broken",
            "nodes": [{ "id": "s", "type": "start" }],
            "flows": [{ "from": "s", "to": "missing" }]
        }
    ]);
    assert!(repository.deploy_json(&batch.to_string()).is_err());
    assert!(repository.list().is_empty());
}

#[test]
fn structural_rules_are_enforced() {
    let repository = DefinitionRepository::new();
    let two_starts = json!({
        "id": "twice", "key": "twice",
        "nodes": [
            { "id": "a", "type": "start" },
            { "id": "b", "type": "start" },
            { "id": "e", "type": "end" }
        ],
        "flows": [{ "from": "a", "to": "e" }, { "from": "b", "to": "e" }]
    });
    assert!(repository.deploy_json(&two_starts.to_string()).is_err());

    let dead_end = json!({
        "id": "stuck", "key": "stuck",
        "nodes": [
            { "id": "s", "type": "start" },
            { "id": "t", "type": "userTask" },
            { "id": "e", "type": "end" }
        ],
        "flows": [{ "from": "s", "to": "t" }]
    });
    let err = repository.deploy_json(&dead_end.to_string()).unwrap_err();
    assert!(err.to_string().contains("`t`"));
}

#[tokio::test]
async fn settings_file_deploys_definitions_on_build() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("defs"))?;
    fs::write(dir.path().join("defs").join("expense.json"), EXPENSE)?;
    let settings_path = dir.path().join("engine.json");
    fs::write(
        &settings_path,
        r#"{ "engineName": "claims", "definitionFiles": ["defs/expense.json"] }"#,
    )?;

    let settings = EngineSettings::from_file(&settings_path)?;
    let engine = ProcessEngineConfiguration::from_settings(settings).build()?;
    assert_eq!(engine.name(), "claims");

    let small: Variables = serde_json::from_value(json!({ "amount": 20 }))?;
    let instance = engine.start_process("expense:1", None, small).await?;
    assert_eq!(instance.status, ProcessInstanceStatus::Completed);
    assert_eq!(instance.variables.get("large"), Some(&json!(false)));
    assert_eq!(instance.variables.get("currency"), Some(&json!("EUR")));

    let large: Variables = serde_json::from_value(json!({ "amount": 250 }))?;
    let instance = engine.start_process("expense:1", None, large).await?;
    let task = engine.tasks_for_process(&instance.id).await?.remove(0);
    assert_eq!(task.name.as_deref(), Some("Approve claim"));

    engine.complete_task(&task.id, Variables::new()).await?;
    let instance = engine.process_instance(&instance.id).await?.expect("instance");
    assert_eq!(
        instance.variables.get("summary"),
        Some(&json!("approved 250 EUR"))
    );
    assert_eq!(instance.status, ProcessInstanceStatus::Completed);
    Ok(())
}

#[test]
fn missing_definition_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = EngineSettings {
        definition_files: vec![dir.path().join("absent.json")],
        ..EngineSettings::default()
    };
    let err = ProcessEngineConfiguration::from_settings(settings)
        .build()
        .err()
        .expect("build should fail");
    assert!(err.to_string().contains("absent.json"));
}
