use deck_batch::app::ProcessingStats;
use deck_batch::{App, AppError, BatchError, Config, DeckTools, HttpRemote, RetryExecutor, RetryPolicy, ToolCall};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_executor() -> RetryExecutor {
    RetryExecutor::new(RetryPolicy {
        base_delay: Duration::from_millis(5),
        ..RetryPolicy::default()
    })
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

async fn mount_card(server: &MockServer, content: &str, id: &str) {
    Mock::given(method("POST"))
        .and(path("/cards"))
        .and(body_partial_json(json!({ "content": content })))
        .respond_with(ok(json!({
            "id": id,
            "content": content,
            "deck_id": "d1",
            "chapter_id": "ch-history"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_cards_with_chapter_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/decks/d1/chapters"))
        .respond_with(ok(json!([{ "id": "ch-math", "name": "Math" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/decks/d1/chapters"))
        .and(body_partial_json(json!({ "name": "History" })))
        .respond_with(ok(json!({ "id": "ch-history", "name": "History" })))
        .expect(1)
        .mount(&server)
        .await;

    mount_card(&server, "Q1", "card-1").await;
    Mock::given(method("POST"))
        .and(path("/cards"))
        .and(body_partial_json(json!({ "content": "Q2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{ "message": "Deck is archived" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_card(&server, "Q3", "card-3").await;

    let remote = HttpRemote::with_base_url(server.uri(), "token");
    let tools = DeckTools::new(&remote, fast_executor(), 4);

    let report = tools
        .invoke(ToolCall::new(
            "create_cards",
            json!({
                "deck_id": "d1",
                "cards": [
                    { "content": "Q1", "chapter": "History" },
                    { "content": "Q2", "chapter": "History" },
                    { "content": "Q3", "chapter": "History" }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(report["summary"], "2 succeeded, 1 failed");
    assert_eq!(report["has_failures"], true);
    assert_eq!(report["outcomes"][0]["value"]["id"], "card-1");
    assert_eq!(report["outcomes"][1]["class"], "validation");
    assert!(report["outcomes"][1]["error"]
        .as_str()
        .unwrap()
        .contains("Deck is archived"));
    assert_eq!(report["outcomes"][2]["value"]["id"], "card-3");
}

#[tokio::test]
async fn test_rate_limited_item_is_retried_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/cards/c1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/cards/c1"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/cards/c2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "message": "Card not found" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = HttpRemote::with_base_url(server.uri(), "");
    let tools = DeckTools::new(&remote, fast_executor(), 4);

    let report = tools
        .invoke(ToolCall::new("delete_cards", json!({ "card_ids": ["c1", "c2"] })))
        .await
        .unwrap();

    assert_eq!(report["succeeded"], 1);
    assert_eq!(report["outcomes"][0]["status"], "succeeded");
    assert_eq!(report["outcomes"][1]["class"], "client");
    assert!(report["outcomes"][1]["error"]
        .as_str()
        .unwrap()
        .contains("Card not found"));
}

#[tokio::test]
async fn test_chapter_listing_failure_fails_whole_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/decks/d1/chapters"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let remote = HttpRemote::with_base_url(server.uri(), "");
    let tools = DeckTools::new(&remote, fast_executor(), 4);

    let result = tools
        .invoke(ToolCall::new(
            "create_chapters",
            json!({ "deck_id": "d1", "names": ["History"] }),
        ))
        .await;

    assert!(matches!(result, Err(AppError::Batch(BatchError::Setup { .. }))));
}

#[tokio::test]
async fn test_app_runs_jobs_folder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/decks/d1/chapters"))
        .respond_with(ok(json!([{ "id": "ch-math", "name": "Math" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cards/c1"))
        .respond_with(ok(json!({ "id": "c1", "content": "Q1", "deck_id": "d1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cards/c2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let root = std::env::temp_dir().join(format!("deck_batch_app_{}", std::process::id()));
    let jobs = root.join("jobs");
    std::fs::create_dir_all(&jobs).unwrap();
    std::fs::write(
        jobs.join("01_list.toml"),
        "tool = \"list_chapters\"\n\n[arguments]\ndeck_id = \"d1\"\n",
    )
    .unwrap();
    std::fs::write(
        jobs.join("02_get.toml"),
        "tool = \"get_cards\"\n\n[arguments]\ncard_ids = [\"c1\", \"c2\"]\n",
    )
    .unwrap();
    std::fs::write(jobs.join("03_unknown.toml"), "tool = \"explode\"\n").unwrap();
    let log_file = root.join("output.txt");

    let config = Config {
        api_base_url: server.uri(),
        retry_base_delay_ms: 5,
        jobs_folder: jobs.to_string_lossy().to_string(),
        output_log_file: log_file.to_string_lossy().to_string(),
        ..Config::default()
    };

    let stats = App::initialize(config).await.unwrap().run().await.unwrap();
    assert_eq!(
        stats,
        ProcessingStats {
            clean: 1,
            partial: 1,
            errored: 1
        }
    );

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("[02_get.toml] get_cards\n1 succeeded, 1 failed"));
    assert!(log.contains("  ✗ c2 [client]"));
    assert!(log.contains("未知工具: explode"));

    std::fs::remove_dir_all(&root).ok();
}
