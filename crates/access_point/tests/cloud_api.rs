use std::sync::{Arc, Mutex};
use std::time::Duration;

use access_point::cloud_api::CloudApiClient;
use access_point::{DeliveryError, Document, MessagingClient, Operation};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use wabc_core::{Recipient, TemplateRef, UploadedAsset};

#[derive(Debug, Clone)]
struct Captured {
    authorization: String,
    content_type: String,
    body: Vec<u8>,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    requests: Arc<Mutex<Vec<Captured>>>,
}

async fn handle(State(stub): State<Stub>, headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    stub.requests.lock().unwrap().push(Captured {
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: body.to_vec(),
    });
    tokio::time::sleep(stub.delay).await;
    (stub.status, stub.body.to_string())
}

async fn serve(status: StatusCode, body: &'static str, delay: Duration) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let stub = Stub {
        status,
        body,
        delay,
        requests: Arc::clone(&requests),
    };
    let app = Router::new()
        .route("/v20.0/123456/media", post(handle))
        .route("/v20.0/123456/messages", post(handle))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), requests)
}

fn client(base: &str, send_timeout: Duration) -> Arc<CloudApiClient> {
    CloudApiClient::with_timeouts(
        base,
        "v20.0",
        "123456",
        "secret-token".to_string(),
        Duration::from_secs(5),
        send_timeout,
    )
    .unwrap()
}

fn document() -> Document {
    Document {
        file_name: "offer.pdf".into(),
        mime_type: "application/pdf".into(),
        bytes: b"%PDF-1.4 body".to_vec(),
    }
}

fn asset() -> UploadedAsset {
    document().into_asset("media-42".into(), "Offer.pdf")
}

fn recipient() -> Recipient {
    Recipient::parse("+27821234567").unwrap()
}

#[tokio::test]
async fn upload_sends_multipart_with_bearer_token() {
    let (base, requests) = serve(StatusCode::OK, r#"{"id":"media-42"}"#, Duration::ZERO).await;
    let id = client(&base, Duration::from_secs(5))
        .upload_asset(&document())
        .await
        .unwrap();
    assert_eq!(id, "media-42");

    let reqs = requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].authorization, "Bearer secret-token");
    assert!(reqs[0].content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&reqs[0].body);
    assert!(body.contains("%PDF-1.4 body"));
    assert!(body.contains("filename=\"offer.pdf\""));
    assert!(body.contains("application/pdf"));
    assert!(body.contains("whatsapp"));
}

#[tokio::test]
async fn upload_unauthorized_carries_status_and_body() {
    let (base, _) = serve(StatusCode::UNAUTHORIZED, r#"{"error":"bad token"}"#, Duration::ZERO).await;
    let err = client(&base, Duration::from_secs(5))
        .upload_asset(&document())
        .await
        .unwrap_err();
    match err {
        DeliveryError::Status { operation, status, body } => {
            assert_eq!(operation, Operation::Upload);
            assert_eq!(status, 401);
            assert!(body.contains("bad token"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn upload_success_without_id_is_a_failure() {
    let (base, _) = serve(StatusCode::OK, r#"{"ok":true}"#, Duration::ZERO).await;
    let err = client(&base, Duration::from_secs(5))
        .upload_asset(&document())
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::MissingId { operation: Operation::Upload, .. }));
}

#[tokio::test]
async fn document_send_posts_json_and_returns_message_id() {
    let (base, requests) = serve(
        StatusCode::OK,
        r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.ABC"}]}"#,
        Duration::ZERO,
    )
    .await;
    let id = client(&base, Duration::from_secs(5))
        .send_document(&recipient(), &asset(), "See attached")
        .await
        .unwrap();
    assert_eq!(id, "wamid.ABC");

    let reqs = requests.lock().unwrap();
    assert!(reqs[0].content_type.starts_with("application/json"));
    let json: serde_json::Value = serde_json::from_slice(&reqs[0].body).unwrap();
    assert_eq!(json["to"], "27821234567");
    assert_eq!(json["type"], "document");
    assert_eq!(json["document"]["id"], "media-42");
    assert_eq!(json["document"]["filename"], "Offer.pdf");
    assert_eq!(json["document"]["caption"], "See attached");
}

#[tokio::test]
async fn template_send_server_error() {
    let (base, _) = serve(StatusCode::INTERNAL_SERVER_ERROR, "oops", Duration::ZERO).await;
    let template = TemplateRef {
        name: "promo".into(),
        language: "en_US".into(),
    };
    let err = client(&base, Duration::from_secs(5))
        .send_template(&recipient(), &template)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "template send failed: 500 oops");
}

#[tokio::test]
async fn send_without_message_id_is_a_failure() {
    let (base, _) = serve(StatusCode::OK, r#"{"messages":[]}"#, Duration::ZERO).await;
    let err = client(&base, Duration::from_secs(5))
        .send_document(&recipient(), &asset(), "")
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::MissingId { operation: Operation::SendDocument, .. }));
}

#[tokio::test]
async fn slow_send_times_out() {
    let (base, _) = serve(StatusCode::OK, r#"{"messages":[{"id":"late"}]}"#, Duration::from_secs(3)).await;
    let err = client(&base, Duration::from_millis(200))
        .send_document(&recipient(), &asset(), "")
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Timeout { operation: Operation::SendDocument, .. }));
}

#[tokio::test]
async fn slow_upload_times_out() {
    let (base, _) = serve(StatusCode::OK, r#"{"id":"late"}"#, Duration::from_secs(3)).await;
    let client = CloudApiClient::with_timeouts(
        &base,
        "v20.0",
        "123456",
        "secret-token".to_string(),
        Duration::from_millis(200),
        Duration::from_secs(5),
    )
    .unwrap();
    let err = client.upload_asset(&document()).await.unwrap_err();
    match err {
        DeliveryError::Timeout { operation, timeout } => {
            assert_eq!(operation, Operation::Upload);
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("unexpected error: {other}"),
    }
}
