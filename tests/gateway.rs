mod common;

use std::sync::atomic::Ordering;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use vector_relay::api::{configure, AppState};

use common::Fixture;

const PASSWORD: &str = "secret";

macro_rules! app {
    ($fixture:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($fixture.relay(), PASSWORD)))
                .configure(configure),
        )
        .await
    };
}

macro_rules! post {
    ($app:expr, $uri:expr, $body:expr $(,)?) => {{
        let req = test::TestRequest::post().uri($uri).set_json($body).to_request();
        let resp = test::call_service(&$app, req).await;
        let status: StatusCode = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

fn long_document() -> String {
    (1..=60)
        .map(|i| {
            format!(
                "User said: message number {} about the garden\nYou said: reply number {} about the weather\n",
                i, i
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[actix_web::test]
async fn create_index_records_collection_with_embedding_dimension() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let (status, body) = post!(
        app,
        "/createIndex",
        json!({ "password": "secret", "indexName": "notes" }),
    );

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "notes");
    assert_eq!(body["dimension"], 1536);
    assert_eq!(fixture.store.inner.index_names(), vec!["notes".to_string()]);
}

#[actix_web::test]
async fn repeated_create_index_leaves_state_unchanged() {
    let fixture = Fixture::new();
    let app = app!(fixture);
    let body = json!({ "password": "secret", "indexName": "notes" });

    let (first_status, first) = post!(app, "/createIndex", body.clone());
    let (second_status, second) = post!(app, "/createIndex", body);

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(fixture.store.inner.index_names(), vec!["notes".to_string()]);
}

#[actix_web::test]
async fn upsert_splits_embeds_and_stores_under_namespace() {
    let fixture = Fixture::new();
    let app = app!(fixture);
    post!(app, "/createIndex", json!({ "password": "secret", "indexName": "notes" }));

    let (status, body) = post!(
        app,
        "/upsert",
        json!({
            "password": "secret",
            "indexName": "notes",
            "nameSpace": "u1",
            "document": { "memoryText": long_document() },
            "chunkSize": 500
        }),
    );

    assert_eq!(status, StatusCode::OK);
    let upserted = body["upsertedCount"].as_u64().unwrap() as usize;
    assert!(upserted > 1, "long document should produce several chunks");
    assert_eq!(body["ids"].as_array().unwrap().len(), upserted);

    let records = fixture.store.inner.records("notes", "u1");
    assert_eq!(records.len(), upserted);
    for record in &records {
        let text = record.metadata["text"].as_str().unwrap();
        assert!(text.chars().count() <= 500);
        assert_eq!(record.values.len(), 1536);
        assert!(record.metadata["loc.lines.from"].as_u64().unwrap() >= 1);
    }
    assert_eq!(fixture.store.inner.vector_count("notes", "other"), 0);
}

#[actix_web::test]
async fn search_returns_top_five_matches_from_namespace() {
    let fixture = Fixture::new();
    let app = app!(fixture);
    post!(app, "/createIndex", json!({ "password": "secret", "indexName": "notes" }));
    post!(
        app,
        "/upsert",
        json!({
            "password": "secret",
            "indexName": "notes",
            "nameSpace": "u1",
            "document": { "memoryText": format!("{}\n\nfind this secret code please", long_document()) },
            "chunkSize": 500
        }),
    );

    let (status, body) = post!(
        app,
        "/search",
        json!({ "password": "secret", "indexName": "notes", "nameSpace": "u1", "query": "find this" }),
    );

    assert_eq!(status, StatusCode::OK);
    let matches = body.as_array().unwrap();
    assert_eq!(matches.len(), 5);
    assert!(matches[0]["pageContent"]
        .as_str()
        .unwrap()
        .contains("find this secret code"));
    assert!(matches[0]["metadata"].get("text").is_none());
    assert!(matches[0]["metadata"]["loc.lines.to"].is_number());
}

#[actix_web::test]
async fn search_honours_explicit_top_k() {
    let fixture = Fixture::new();
    let app = app!(fixture);
    post!(app, "/createIndex", json!({ "password": "secret", "indexName": "notes" }));
    post!(
        app,
        "/upsert",
        json!({
            "password": "secret", "indexName": "notes", "nameSpace": "u1",
            "document": { "memoryText": long_document() }, "chunkSize": 500
        }),
    );

    let (status, body) = post!(
        app,
        "/search",
        json!({ "password": "secret", "indexName": "notes", "nameSpace": "u1", "query": "garden", "topK": 2 }),
    );

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn missing_password_is_bad_request_without_downstream_calls() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let (status, body) = post!(
        app,
        "/search",
        json!({ "indexName": "notes", "nameSpace": "u1", "query": "x" }),
    );

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "password, indexName, query, and nameSpace are required fields."
    );
    assert_eq!(fixture.downstream_calls(), 0);
}

#[actix_web::test]
async fn every_missing_field_is_rejected_on_every_endpoint() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let cases = [
        (
            "/search",
            json!({ "password": "secret", "indexName": "notes", "nameSpace": "u1", "query": "x" }),
        ),
        (
            "/upsert",
            json!({
                "password": "secret", "indexName": "notes", "nameSpace": "u1",
                "document": { "memoryText": "text" }, "chunkSize": 500
            }),
        ),
        (
            "/createIndex",
            json!({ "password": "secret", "indexName": "notes" }),
        ),
    ];

    for (uri, full) in cases {
        for field in full.as_object().unwrap().keys() {
            let mut body = full.clone();
            body.as_object_mut().unwrap().remove(field);
            let (status, response) = post!(app, uri, body);
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} without {}", uri, field);
            assert!(response["error"].as_str().unwrap().contains("required fields"));
        }
    }

    assert_eq!(fixture.downstream_calls(), 0);
}

#[actix_web::test]
async fn wrong_password_is_forbidden_without_downstream_calls() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    for (uri, body) in [
        (
            "/search",
            json!({ "password": "guess", "indexName": "notes", "nameSpace": "u1", "query": "x" }),
        ),
        (
            "/upsert",
            json!({
                "password": "guess", "indexName": "notes", "nameSpace": "u1",
                "document": { "memoryText": "text" }, "chunkSize": 500
            }),
        ),
        ("/createIndex", json!({ "password": "guess", "indexName": "notes" })),
    ] {
        let (status, response) = post!(app, uri, body);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response["error"], "Invalid password.");
    }

    assert_eq!(fixture.downstream_calls(), 0);
}

#[actix_web::test]
async fn non_integer_chunk_size_fails_as_server_error() {
    let fixture = Fixture::new();
    let app = app!(fixture);
    post!(app, "/createIndex", json!({ "password": "secret", "indexName": "notes" }));

    for chunk_size in [json!("500"), json!(2.5), json!(true)] {
        let (status, body) = post!(app,
            "/upsert",
            json!({
                "password": "secret", "indexName": "notes", "nameSpace": "u1",
                "document": { "memoryText": "some text" }, "chunkSize": chunk_size
            }),
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "chunkSize must be an integer");
    }

    assert_eq!(fixture.embedder.calls(), 0);
    assert_eq!(fixture.store.inner.vector_count("notes", "u1"), 0);
}

#[actix_web::test]
async fn upsert_into_unknown_index_is_server_error() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let (status, body) = post!(
        app,
        "/upsert",
        json!({
            "password": "secret", "indexName": "missing", "nameSpace": "u1",
            "document": { "memoryText": "some text" }, "chunkSize": 500
        }),
    );

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Index not found: missing");
}

#[actix_web::test]
async fn malformed_body_is_bad_request() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let req = test::TestRequest::post()
        .uri("/search")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn health_reports_store_backend() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "counting-memory");
}

#[actix_web::test]
async fn failed_upsert_leaves_earlier_chunks_stored() {
    let fixture = Fixture::new();
    let app = app!(fixture);
    post!(app, "/createIndex", json!({ "password": "secret", "indexName": "notes" }));
    let upsert = json!({
        "password": "secret", "indexName": "notes", "nameSpace": "u1",
        "document": { "memoryText": long_document() }, "chunkSize": 500
    });

    let (status, first) = post!(app, "/upsert", upsert.clone());
    assert_eq!(status, StatusCode::OK);
    let stored = fixture.store.inner.records("notes", "u1");

    fixture.store.fail_upserts.store(true, Ordering::SeqCst);
    let (status, body) = post!(app, "/upsert", upsert);

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "upsert rejected by store");
    let after: Vec<String> = fixture
        .store
        .inner
        .records("notes", "u1")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(after.len(), first["upsertedCount"].as_u64().unwrap() as usize);
    assert_eq!(after, stored.into_iter().map(|r| r.id).collect::<Vec<_>>());
}

#[actix_web::test]
async fn mistyped_fields_keep_the_validation_order() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let (status, body) = post!(
        app,
        "/createIndex",
        json!({ "password": 123, "indexName": "notes" }),
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid password.");

    let (status, _) = post!(
        app,
        "/upsert",
        json!({
            "password": "guess", "indexName": "notes", "nameSpace": "u1",
            "document": "plain text", "chunkSize": 500
        }),
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = post!(
        app,
        "/upsert",
        json!({
            "password": "secret", "indexName": "notes", "nameSpace": "u1",
            "document": "plain text", "chunkSize": 500
        }),
    );
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("document is invalid"));

    assert_eq!(fixture.downstream_calls(), 0);
}

#[actix_web::test]
async fn health_reports_unreachable_store() {
    let fixture = Fixture::new();
    fixture.store.unreachable.store(true, Ordering::SeqCst);
    let app = app!(fixture);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["error"], "store unreachable");
}
