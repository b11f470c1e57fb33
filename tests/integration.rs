//! Integration tests for the client, the pagination aggregator, and the
//! MCP tool registry, against a mocked HTTP remote.

use serde_json::{json, Map, Value as JsonValue};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use td_mcp::client::{ListParams, TdClient, AGGREGATION_PAGE_SIZE};
use td_mcp::{ClientConfig, TdError, ToolRegistry};

/// Client pointed at a mock server, bypassing environment resolution.
fn test_client(server: &MockServer) -> TdClient {
    TdClient::new(ClientConfig {
        api_key: "test-key".to_string(),
        endpoint: server.uri(),
        workflow_endpoint: server.uri(),
    })
    .expect("failed to build client")
}

fn database_json(name: &str) -> JsonValue {
    json!({
        "name": name,
        "created_at": "2024-01-01 00:00:00 UTC",
        "updated_at": "2024-01-02 00:00:00 UTC",
        "count": 100,
        "permission": "administrator",
        "delete_protected": false
    })
}

fn databases_json(count: usize) -> Vec<JsonValue> {
    (0..count).map(|i| database_json(&format!("db{}", i))).collect()
}

fn table_json(name: &str, schema: &str) -> JsonValue {
    json!({
        "id": 1,
        "name": name,
        "estimated_storage_size": 2048,
        "counter_updated_at": "2024-01-01 00:00:00 UTC",
        "delete_protected": false,
        "created_at": "2024-01-01 00:00:00 UTC",
        "updated_at": "2024-01-02 00:00:00 UTC",
        "type": "log",
        "include_v": true,
        "count": 42,
        "schema": schema
    })
}

fn project_json(id: &str, name: &str, system: bool) -> JsonValue {
    let metadata = if system {
        json!([{"key": "sys", "value": "true"}])
    } else {
        json!([])
    };
    json!({
        "id": id,
        "name": name,
        "revision": "abc123",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-02T00:00:00Z",
        "archiveType": "db",
        "archiveMd5": "0123456789abcdef",
        "metadata": metadata
    })
}

fn workflow_json(
    id: &str,
    name: &str,
    project: (&str, &str, bool),
    last_status: Option<&str>,
    scheduled: bool,
) -> JsonValue {
    let (project_id, project_name, system) = project;
    let metadata = if system {
        json!([{"key": "sys", "value": "true"}])
    } else {
        json!([])
    };
    let sessions = match last_status {
        Some(status) => json!([{
            "session_time": "2024-02-01T02:00:00+00:00",
            "last_attempt": {"status": status, "success": status == "success"}
        }]),
        None => json!([]),
    };
    json!({
        "id": id,
        "name": name,
        "project": {"id": project_id, "name": project_name, "metadata": metadata},
        "timezone": "UTC",
        "schedule": if scheduled { json!({"daily>": "02:00:00"}) } else { JsonValue::Null },
        "latest_sessions": sessions
    })
}

/// Build a tar.gz archive in memory from (name, content) pairs.
fn archive_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, *name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

async fn dispatch(
    registry: &ToolRegistry,
    client: &TdClient,
    name: &str,
    args: JsonValue,
) -> Result<JsonValue, TdError> {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    registry.dispatch(client, name, args_map).await
}

#[tokio::test]
async fn single_page_respects_limit_and_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": databases_json(10)[2..7].to_vec()
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let page = client
        .list_databases(ListParams {
            limit: 5,
            offset: 2,
            all_results: false,
        })
        .await
        .unwrap();

    let names: Vec<&str> = page.iter().map(|db| db.name.as_str()).collect();
    assert_eq!(names, vec!["db2", "db3", "db4", "db5", "db6"]);
}

#[tokio::test]
async fn all_results_aggregates_every_page_size() {
    // Exercise the short-page termination around the page-size boundary,
    // including the exact-multiple case that needs one extra empty page.
    for total in [
        0,
        AGGREGATION_PAGE_SIZE - 1,
        AGGREGATION_PAGE_SIZE,
        AGGREGATION_PAGE_SIZE + 1,
    ] {
        let server = MockServer::start().await;
        let all = databases_json(total);

        let mut offset = 0;
        loop {
            let end = (offset + AGGREGATION_PAGE_SIZE).min(total);
            Mock::given(method("GET"))
                .and(path("/v3/database/list"))
                .and(query_param("limit", AGGREGATION_PAGE_SIZE.to_string()))
                .and(query_param("offset", offset.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "databases": all[offset..end].to_vec()
                })))
                .mount(&server)
                .await;
            if end - offset < AGGREGATION_PAGE_SIZE {
                break;
            }
            offset = end;
        }

        let client = test_client(&server);
        let results = client.list_databases(ListParams::all()).await.unwrap();

        assert_eq!(results.len(), total, "total {}", total);
        for (i, db) in results.iter().enumerate() {
            assert_eq!(db.name, format!("db{}", i), "order for total {}", total);
        }
    }
}

#[tokio::test]
async fn api_error_mid_aggregation_is_not_a_partial_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": databases_json(AGGREGATION_PAGE_SIZE)
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .and(query_param("offset", AGGREGATION_PAGE_SIZE.to_string()))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.list_databases(ListParams::all()).await.unwrap_err();
    match err {
        TdError::Api { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("internal error"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn get_database_missing_is_none_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": [database_json("alpha"), database_json("beta")]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.get_database("missing").await.unwrap().is_none());
    assert_eq!(
        client.get_database("beta").await.unwrap().unwrap().name,
        "beta"
    );
}

#[tokio::test]
async fn malformed_listing_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "unexpected": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .list_databases(ListParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TdError::Parse(_)));
}

#[tokio::test]
async fn env_api_key_wins_over_explicit_parameter() {
    let server = MockServer::start().await;
    // Only the env key is accepted; a request carrying the parameter key
    // would fall through to the mock server's 404.
    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .and(header("authorization", "TD1 env-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": [database_json("alpha")]
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    std::env::set_var("TD_API_KEY", "env-key");
    let client =
        TdClient::from_env(Some("param-key"), Some(uri.as_str()), Some(uri.as_str())).unwrap();
    std::env::remove_var("TD_API_KEY");

    let databases = client.list_databases(ListParams::default()).await.unwrap();
    assert_eq!(databases.len(), 1);
}

#[tokio::test]
async fn list_tables_tool_reports_names_and_columns() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": [database_json("mydb")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/table/list/mydb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [table_json("events", r#"[["time","long"],["user_id","string"]]"#)]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ToolRegistry::new();

    let result = dispatch(
        &registry,
        &client,
        "td_list_tables",
        json!({"database_name": "mydb"}),
    )
    .await
    .unwrap();
    assert_eq!(result["database"], "mydb");
    assert_eq!(result["tables"], json!(["events"]));

    let result = dispatch(
        &registry,
        &client,
        "td_list_tables",
        json!({"database_name": "mydb", "verbose": true}),
    )
    .await
    .unwrap();
    let columns = &result["tables"][0]["columns"];
    assert_eq!(columns[0]["name"], "time");
    assert_eq!(columns[1]["type"], "string");

    // An unknown database is reported distinctly, before listing tables.
    let err = dispatch(
        &registry,
        &client,
        "td_list_tables",
        json!({"database_name": "nope"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TdError::InvalidArg { .. }));
}

#[tokio::test]
async fn list_projects_tool_hides_system_projects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [
                project_json("1", "user_pipeline", false),
                project_json("2", "sys_maintenance", true)
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ToolRegistry::new();

    let result = dispatch(&registry, &client, "td_list_projects", json!({}))
        .await
        .unwrap();
    assert_eq!(result["projects"], json!([{"id": "1", "name": "user_pipeline"}]));

    let result = dispatch(
        &registry,
        &client,
        "td_list_projects",
        json!({"include_system": true}),
    )
    .await
    .unwrap();
    assert_eq!(result["projects"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn get_project_missing_is_null_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/999"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.get_project("999").await.unwrap().is_none());

    let registry = ToolRegistry::new();
    let result = dispatch(
        &registry,
        &client,
        "td_get_project",
        json!({"project_id": "999"}),
    )
    .await
    .unwrap();
    assert_eq!(result["project"], JsonValue::Null);
    assert!(result["message"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn list_workflows_tool_filters_and_summarizes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/workflows"))
        .and(query_param("count", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflows": [
                workflow_json("10", "daily_etl", ("1", "analytics", false), Some("success"), true),
                workflow_json("11", "hourly_sync", ("1", "analytics", false), Some("error"), true),
                workflow_json("12", "scratch", ("2", "sys_scratch", true), Some("success"), false),
                workflow_json("13", "new_flow", ("3", "marketing", false), None, false)
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ToolRegistry::new();

    // System-project workflows are hidden by default.
    let result = dispatch(&registry, &client, "td_list_workflows", json!({}))
        .await
        .unwrap();
    assert_eq!(result["total_count"], 3);
    let summaries = result["workflows"].as_array().unwrap();
    assert_eq!(summaries[0]["name"], "daily_etl");
    assert_eq!(summaries[0]["last_status"], "success");
    assert_eq!(summaries[2]["last_status"], "no_runs");
    assert_eq!(summaries[2]["scheduled"], false);

    let result = dispatch(
        &registry,
        &client,
        "td_list_workflows",
        json!({"include_system": true, "status_filter": "error"}),
    )
    .await
    .unwrap();
    assert_eq!(result["total_count"], 1);
    assert_eq!(result["workflows"][0]["name"], "hourly_sync");

    // Search matches project names too.
    let result = dispatch(
        &registry,
        &client,
        "td_list_workflows",
        json!({"search": "marketing", "verbose": true}),
    )
    .await
    .unwrap();
    assert_eq!(result["total_count"], 1);
    assert_eq!(result["workflows"][0]["project"]["name"], "marketing");
    assert_eq!(result["workflows"][0]["sessions"], json!([]));
}

#[tokio::test]
async fn find_workflow_prefers_exact_name_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/workflows"))
        .and(query_param("count", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflows": [
                workflow_json("10", "etl", ("1", "analytics", false), Some("success"), true),
                workflow_json("11", "etl_backfill", ("1", "analytics", false), Some("error"), false)
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ToolRegistry::new();

    // "etl" matches both by substring, but the exact match wins alone.
    let result = dispatch(&registry, &client, "td_find_workflow", json!({"name": "ETL"}))
        .await
        .unwrap();
    assert_eq!(result["found"], true);
    assert_eq!(result["count"], 1);
    assert_eq!(result["workflows"][0]["id"], "10");
    assert_eq!(
        result["workflows"][0]["latest_session"]["status"],
        "success"
    );

    let result = dispatch(
        &registry,
        &client,
        "td_find_workflow",
        json!({"name": "backfill", "status_filter": "error"}),
    )
    .await
    .unwrap();
    assert_eq!(result["count"], 1);
    assert_eq!(result["workflows"][0]["name"], "etl_backfill");

    let result = dispatch(
        &registry,
        &client,
        "td_find_workflow",
        json!({"name": "nope"}),
    )
    .await
    .unwrap();
    assert_eq!(result["found"], false);
    assert_eq!(result["count"], 0);
    assert!(result["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn find_project_falls_back_to_workflow_scan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [project_json("1", "user_pipeline", false)]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflows": [
                workflow_json("10", "a", ("7", "hidden_project", false), Some("success"), true),
                workflow_json("11", "b", ("7", "hidden_project", false), None, false),
                workflow_json("12", "c", ("8", "other", false), None, false)
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ToolRegistry::new();

    // Direct hit in the project listing, no fallback involved.
    let result = dispatch(
        &registry,
        &client,
        "td_find_project",
        json!({"name": "pipeline"}),
    )
    .await
    .unwrap();
    assert_eq!(result["found"], true);
    assert_eq!(result["projects"][0]["id"], "1");
    assert!(result.get("source").is_none());

    // Only visible through its workflows.
    let result = dispatch(
        &registry,
        &client,
        "td_find_project",
        json!({"name": "hidden_project"}),
    )
    .await
    .unwrap();
    assert_eq!(result["found"], true);
    assert_eq!(result["source"], "workflows");
    assert_eq!(result["count"], 1);
    assert_eq!(result["projects"][0]["id"], "7");
    assert_eq!(result["projects"][0]["workflow_count"], 2);

    let result = dispatch(
        &registry,
        &client,
        "td_find_project",
        json!({"name": "nowhere"}),
    )
    .await
    .unwrap();
    assert_eq!(result["found"], false);
}

#[tokio::test]
async fn get_project_by_name_fetches_full_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [project_json("42", "Etl_Project", false)]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(project_json("42", "Etl_Project", false)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ToolRegistry::new();

    let result = dispatch(
        &registry,
        &client,
        "td_get_project_by_name",
        json!({"name": "etl_project"}),
    )
    .await
    .unwrap();
    assert_eq!(result["project"]["id"], "42");
    assert_eq!(result["project"]["revision"], "abc123");

    let result = dispatch(
        &registry,
        &client,
        "td_get_project_by_name",
        json!({"name": "unknown"}),
    )
    .await
    .unwrap();
    assert_eq!(result["project"], JsonValue::Null);
    assert!(result["message"].as_str().unwrap().contains("unknown"));
}

#[tokio::test]
async fn archive_download_list_read_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(project_json("123", "etl_project", false)),
        )
        .mount(&server)
        .await;

    let bytes = archive_bytes(&[
        ("workflow.dig", "timezone: UTC\n+task:\n  td>: queries/daily.sql\n"),
        ("queries/daily.sql", "select count(*) from events"),
    ]);
    Mock::given(method("GET"))
        .and(path("/api/projects/123/archive"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let registry = ToolRegistry::new();

    let download = dispatch(
        &registry,
        &client,
        "td_download_project_archive",
        json!({"project_id": "123"}),
    )
    .await
    .unwrap();
    assert_eq!(download["success"], true);
    assert_eq!(download["project_name"], "etl_project");
    let archive_path = download["archive_path"].as_str().unwrap().to_string();
    assert!(std::path::Path::new(&archive_path).exists());

    let listing = dispatch(
        &registry,
        &client,
        "td_list_project_files",
        json!({"archive_path": archive_path}),
    )
    .await
    .unwrap();
    assert_eq!(listing["file_count"], 2);

    // Every listed entry is readable afterwards.
    for file in listing["files"].as_array().unwrap() {
        let read = dispatch(
            &registry,
            &client,
            "td_read_project_file",
            json!({"archive_path": archive_path, "file_path": file["name"]}),
        )
        .await
        .unwrap();
        assert_eq!(read["size"], file["size"]);
    }

    let err = dispatch(
        &registry,
        &client,
        "td_read_project_file",
        json!({"archive_path": archive_path, "file_path": "missing.sql"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TdError::EntryNotFound(_)));

    // Staged files are caller-owned; clean up the staging directory here.
    let staging_dir = std::path::Path::new(&archive_path).parent().unwrap();
    std::fs::remove_dir_all(staging_dir).unwrap();
}

#[tokio::test]
async fn archive_tools_reject_unstaged_paths() {
    let server = MockServer::start().await;
    let client = test_client(&server);
    let registry = ToolRegistry::new();

    let err = dispatch(
        &registry,
        &client,
        "td_list_project_files",
        json!({"archive_path": "/home/user/archive.tar.gz"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TdError::InvalidArg { .. }));

    let err = dispatch(
        &registry,
        &client,
        "td_download_project_archive",
        json!({"project_id": "../evil"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TdError::InvalidArg { .. }));
}

#[tokio::test]
async fn unknown_tool_is_an_error() {
    let server = MockServer::start().await;
    let client = test_client(&server);
    let registry = ToolRegistry::new();

    let err = dispatch(&registry, &client, "td_drop_database", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, TdError::UnknownTool(_)));
}
