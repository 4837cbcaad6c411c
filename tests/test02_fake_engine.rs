use chrono::{TimeZone, Utc};
use serde_json::json;
use sql_script_bridge::prelude::*;

mod common {
    pub mod scripted;
}

use common::scripted::{ScriptedEngine, ScriptedResult};

fn user_rows() -> ScriptedResult {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    ScriptedResult::new(
        &["ID", "NAME", "CREATED"],
        vec![
            vec![
                DriverValue::Int(42),
                DriverValue::Text("Ann".into()),
                DriverValue::Timestamp(created),
            ],
            vec![
                DriverValue::Int(43),
                DriverValue::Null,
                DriverValue::Timestamp(created),
            ],
        ],
    )
}

#[test]
fn template_query_binds_and_marshals_rows() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&[]);
    engine.on_query("USER.ALL", user_rows());
    let bridge = SqlBridge::new(&engine);

    let rows = bridge.execute_query(
        &TemplateRequest::new("USER", "ALL")
            .param("name", "")
            .param("active", true),
    )?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].column_names(), ["ID", "NAME", "CREATED"]);
    assert_eq!(rows[0].get("ID"), Some(&HostValue::Num(42.0)));
    assert_eq!(rows[0].get("NAME"), Some(&HostValue::from("Ann")));
    assert_eq!(
        rows[0].get("CREATED"),
        Some(&HostValue::Instant(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap().timestamp_millis()
        ))
    );
    assert_eq!(rows[1].get("NAME"), Some(&HostValue::Null));

    let bound = engine.bound_params();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].get("name"), Some(&DriverValue::Null));
    assert_eq!(bound[0].get("active"), Some(&DriverValue::Bool(true)));

    assert_eq!(
        engine.calls(),
        ["query default USER.ALL", "close_open_cursor default"]
    );
    assert!(engine.all_cursors_closed());
    Ok(())
}

#[test]
fn named_resource_is_passed_through() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&["audit"]);
    engine.on_update("delete from log", 3);
    let bridge = SqlBridge::new(&engine);

    let count = bridge.execute_update_sql(&SqlRequest::new("delete from log").on("audit"))?;
    assert_eq!(count, 3);
    bridge.commit(Some(&ResourceId::new("audit")))?;

    assert_eq!(engine.calls(), ["update audit delete from log", "commit audit"]);
    Ok(())
}

#[test]
fn unknown_resource_error_surfaces_unchanged() {
    let engine = ScriptedEngine::new(&[]);
    let bridge = SqlBridge::new(&engine);

    let err = bridge
        .execute_sql(&SqlRequest::new("select 1").on("missing"))
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::UnknownResource(name) if name == "missing"));
}

#[test]
fn failed_query_still_releases_cursor_state() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&[]);
    engine.fail("select broken", "no such table: broken");
    let bridge = SqlBridge::new(&engine);

    let err = bridge
        .execute_query_sql(&SqlRequest::new("select broken"))
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::ExecutionError(msg) if msg.contains("broken")));
    assert_eq!(
        engine.calls(),
        ["query default select broken", "close_open_cursor default"]
    );

    // the resource takes the next query
    bridge.execute_query_sql(&SqlRequest::new("select 1"))?;
    Ok(())
}

#[test]
fn fetch_failure_closes_cursor_and_propagates() {
    let engine = ScriptedEngine::new(&[]);
    engine.on_query("USER.ALL", user_rows().failing_after(1));
    let bridge = SqlBridge::new(&engine);

    let err = bridge
        .execute_query(&TemplateRequest::new("USER", "ALL"))
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::ExecutionError(msg) if msg == "fetch failed"));
    assert!(engine.all_cursors_closed());
    assert!(!engine.has_open_cursor("default"));
}

#[test]
fn close_failure_after_success_is_reported() {
    let engine = ScriptedEngine::new(&[]);
    engine.on_query("USER.ALL", user_rows().failing_close());
    let bridge = SqlBridge::new(&engine);

    let err = bridge
        .execute_query(&TemplateRequest::new("USER", "ALL"))
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::ExecutionError(msg) if msg == "close failed"));
    assert!(!engine.has_open_cursor("default"));
}

#[test]
fn mapper_error_releases_resource() {
    let engine = ScriptedEngine::new(&[]);
    engine.on_query("USER.ALL", user_rows());
    let bridge = SqlBridge::new(&engine).with_mapper(FnMapper::new(
        |row: RawRow, _mapping: Option<&Mapping>| match row.get("NAME") {
            Some(HostValue::Str(name)) => Ok(name.clone()),
            _ => Err(SqlBridgeError::MappingError("NAME is required".into())),
        },
    ));

    let err = bridge
        .execute_query(&TemplateRequest::new("USER", "ALL"))
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::MappingError(_)));
    assert!(engine.all_cursors_closed());
    assert!(!engine.has_open_cursor("default"));
}

#[test]
fn mapper_receives_request_mapping() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&[]);
    engine.on_query("USER.ALL", user_rows());
    let bridge = SqlBridge::new(&engine).with_mapper(FnMapper::new(
        |row: RawRow, mapping: Option<&Mapping>| {
            let key = mapping
                .and_then(|m| m.get("key"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or("ID");
            Ok(row.get(key).cloned().unwrap_or_default())
        },
    ));

    let ids = bridge.execute_query(
        &TemplateRequest::new("USER", "ALL").mapping(json!({"key": "ID"})),
    )?;
    assert_eq!(ids, [HostValue::Num(42.0), HostValue::Num(43.0)]);
    Ok(())
}

#[test]
fn get_single_takes_first_row_or_none() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&[]);
    engine.on_query("USER.ALL", user_rows());
    let bridge = SqlBridge::new(&engine);

    let first = bridge
        .get_single(&TemplateRequest::new("USER", "ALL"))?
        .ok_or("expected a row")?;
    assert_eq!(first.get("ID"), Some(&HostValue::Num(42.0)));

    assert!(bridge.get_single_sql(&SqlRequest::new("select nothing"))?.is_none());
    Ok(())
}

#[test]
fn unsupported_values_are_reported_once_and_kept() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&[]);
    let uuid = DriverValue::Other {
        type_name: "UUID".into(),
        value: "3f2a".into(),
    };
    engine.on_query(
        "select id, token from t",
        ScriptedResult::new(&["id", "token"], vec![vec![DriverValue::Long(1), uuid.clone()]]),
    );
    let diagnostics = RecordingDiagnostics::new();
    let bridge = SqlBridge::new(&engine).with_diagnostics(&diagnostics);

    let rows = bridge.execute_query_sql(&SqlRequest::new("select id, token from t"))?;
    assert_eq!(rows[0].get("token"), Some(&HostValue::Unconverted(uuid)));

    let reports = diagnostics.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].value_description, "3f2a");
    assert_eq!(reports[0].driver_class_name, "UUID");
    Ok(())
}

#[test]
fn json_mapper_yields_host_objects() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&[]);
    engine.on_query("USER.ALL", user_rows());
    let bridge = SqlBridge::new(&engine).with_mapper(JsonMapper);

    let rows = bridge.execute_query(&TemplateRequest::new("USER", "ALL"))?;
    assert_eq!(
        rows[0],
        json!({"ID": 42, "NAME": "Ann", "CREATED": "2024-05-01T12:00:00.000Z"})
    );
    Ok(())
}

#[test]
fn transaction_calls_delegate() -> Result<(), Box<dyn std::error::Error>> {
    let engine = ScriptedEngine::new(&["audit"]);
    let bridge = SqlBridge::new(&engine);

    bridge.execute(&TemplateRequest::new("DDL", "CREATE").on("audit"))?;
    bridge.rollback(Some(&ResourceId::new("audit")))?;
    bridge.commit(None)?;
    bridge.close_all()?;

    assert_eq!(
        engine.calls(),
        [
            "execute audit DDL.CREATE",
            "rollback audit",
            "commit default",
            "close_all"
        ]
    );
    Ok(())
}
