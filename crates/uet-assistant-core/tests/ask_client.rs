// Answer-service client tests
//
// Each test starts a throwaway axum server on a random local port that plays
// the part of the backend's /ask endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uet_assistant_core::{
    AnswerService, AskClient, AskError, ChatRole, ChatSession, Citation, APOLOGY_TEXT,
};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve mock backend");
    });
    format!("http://{addr}/ask")
}

fn echo_backend() -> Router {
    Router::new().route(
        "/ask",
        post(|Json(body): Json<Value>| async move {
            let question = body["question"].as_str().unwrap_or_default().to_string();
            Json(json!({
                "answer": format!("You asked: {question}"),
                "citations": [{ "page": 3 }, { "page": 15 }],
                "agent": { "tool": "finder_agent", "action": "read_prospectus" }
            }))
        }),
    )
}

#[tokio::test]
async fn posts_question_and_parses_answer() {
    let endpoint = spawn_backend(echo_backend()).await;
    let client = AskClient::new(&endpoint, TIMEOUT).unwrap();

    let response = client.ask("What departments exist?").await.unwrap();

    assert_eq!(response.answer, "You asked: What departments exist?");
    assert_eq!(
        response.citations,
        Some(vec![Citation { page: 3 }, Citation { page: 15 }])
    );
    assert_eq!(response.agent.unwrap().tool, "finder_agent");
}

#[tokio::test]
async fn answer_only_body_is_accepted() {
    let router = Router::new().route("/ask", post(|| async { Json(json!({ "answer": "CS, EE, ME" })) }));
    let endpoint = spawn_backend(router).await;
    let client = AskClient::new(&endpoint, TIMEOUT).unwrap();

    let response = client.ask("What departments exist?").await.unwrap();
    assert_eq!(response.answer, "CS, EE, ME");
    assert!(response.citations.is_none());
    assert!(response.agent.is_none());
}

#[tokio::test]
async fn non_success_status_is_server_error() {
    let router = Router::new().route(
        "/ask",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Server error") }),
    );
    let endpoint = spawn_backend(router).await;
    let client = AskClient::new(&endpoint, TIMEOUT).unwrap();

    match client.ask("anything").await {
        Err(AskError::Server { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "Server error");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_body_is_malformed() {
    let router = Router::new().route("/ask", post(|| async { "definitely not json" }));
    let endpoint = spawn_backend(router).await;
    let client = AskClient::new(&endpoint, TIMEOUT).unwrap();

    let err = client.ask("anything").await.unwrap_err();
    assert!(matches!(err, AskError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn body_without_answer_is_malformed() {
    let router = Router::new().route("/ask", post(|| async { Json(json!({ "reply": "hi" })) }));
    let endpoint = spawn_backend(router).await;
    let client = AskClient::new(&endpoint, TIMEOUT).unwrap();

    let err = client.ask("anything").await.unwrap_err();
    assert!(matches!(err, AskError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    // Grab a free port, then release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = AskClient::new(&format!("http://{addr}/ask"), TIMEOUT).unwrap();
    let err = client.ask("anything").await.unwrap_err();

    assert!(matches!(err, AskError::Transport(_)), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn slow_backend_times_out() {
    let router = Router::new().route(
        "/ask",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "answer": "late" }))
        }),
    );
    let endpoint = spawn_backend(router).await;
    let client = AskClient::new(&endpoint, Duration::from_millis(100)).unwrap();

    let err = client.ask("anything").await.unwrap_err();
    assert!(matches!(err, AskError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn session_round_trip_over_http() {
    let endpoint = spawn_backend(echo_backend()).await;
    let client = AskClient::new(&endpoint, TIMEOUT).unwrap();
    let mut session = ChatSession::new(Arc::new(client), TIMEOUT);

    session.update_draft("Tell me about Computer Science programs");
    session.send();
    let answer = session.wait_for_response().await.cloned().unwrap();

    assert_eq!(answer.role, ChatRole::Assistant);
    assert_eq!(answer.content, "You asked: Tell me about Computer Science programs");
    assert_eq!(answer.citations().len(), 2);
    assert_eq!(session.messages().len(), 3);
}

#[tokio::test]
async fn session_turns_server_error_into_apology() {
    let router = Router::new().route("/ask", post(|| async { StatusCode::BAD_GATEWAY }));
    let endpoint = spawn_backend(router).await;
    let client = AskClient::new(&endpoint, TIMEOUT).unwrap();
    let mut session = ChatSession::new(Arc::new(client), TIMEOUT);

    session.update_draft("What departments exist?");
    session.send();
    let reply = session.wait_for_response().await.cloned().unwrap();

    assert!(reply.is_error);
    assert_eq!(reply.content, APOLOGY_TEXT);
    assert!(!session.is_pending());
}
