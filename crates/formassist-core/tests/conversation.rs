use std::time::Duration;

use formassist_core::state::{NO_FILE_SELECTED, UPLOAD_ERROR};
use formassist_core::{
    ApiError, AssistantClient, Conversation, Message, Rejected, UploadFile,
};
use serde_json::json;
use wiremock::matchers::{any, body_json, body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn conversation(server: &MockServer, language: &str) -> Conversation {
    Conversation::new(AssistantClient::new(&server.uri()), language)
}

async fn expect_no_requests(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn chat_reply_is_appended_after_user_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"message": "hello", "language": "english"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "X"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut convo = conversation(&server, "english");
    convo.submit_message("hello").await.unwrap();

    let session = convo.session();
    assert_eq!(
        session.transcript(),
        &[Message::user("hello"), Message::assistant("X")]
    );
    assert!(session.draft.is_empty());
    assert_eq!(session.download_link(), None);
    assert!(!session.in_flight().chat);
}

#[tokio::test]
async fn download_link_from_latest_reply_wins() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({"message": "first"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"reply": "one", "download_link": "/dl/1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({"message": "second"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"reply": "two", "download_link": "/dl/2"})),
        )
        .mount(&server)
        .await;

    let mut convo = conversation(&server, "english");
    convo.submit_message("first").await.unwrap();
    assert_eq!(convo.session().download_link(), Some("/dl/1"));

    convo.submit_message("second").await.unwrap();
    assert_eq!(convo.session().download_link(), Some("/dl/2"));
}

#[tokio::test]
async fn chat_server_error_adds_no_transcript_entry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Message cannot be empty"})),
        )
        .mount(&server)
        .await;

    let mut convo = conversation(&server, "english");
    convo.submit_message("answer").await.unwrap();

    let session = convo.session();
    assert_eq!(session.transcript(), &[Message::user("answer")]);
    assert!(session.draft.is_empty());
    assert!(!session.in_flight().chat);
    assert!(session.notice().unwrap().contains("Message cannot be empty"));
}

#[tokio::test]
async fn empty_message_issues_no_request() {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;

    let mut convo = conversation(&server, "english");
    assert_eq!(convo.submit_message("").await, Err(Rejected::EmptyMessage));
    assert_eq!(convo.submit_message(" \t").await, Err(Rejected::EmptyMessage));
    assert!(convo.session().transcript().is_empty());
}

#[tokio::test]
async fn rephrase_replaces_placeholder_with_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "Your employer?"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rephrase"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"reply": "Who do you work for?"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut convo = conversation(&server, "english");
    convo.submit_message("start").await.unwrap();
    let before = convo.session().transcript().len();

    convo.request_rephrase().await.unwrap();

    let session = convo.session();
    assert_eq!(session.transcript().len(), before + 1);
    assert_eq!(
        session.transcript().last(),
        Some(&Message::assistant("Who do you work for?"))
    );
    assert!(session.transcript().iter().all(|m| !m.is_pending()));
    assert!(!session.in_flight().rephrase);
}

#[tokio::test]
async fn failed_rephrase_clears_flag() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rephrase"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut convo = conversation(&server, "english");
    convo.request_rephrase().await.unwrap();

    let session = convo.session();
    assert!(!session.in_flight().rephrase);
    assert!(session.transcript().is_empty());
    assert!(session.notice().unwrap().contains("HTTP 503"));
}

#[tokio::test]
async fn upload_without_file_issues_no_request() {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;

    let mut convo = conversation(&server, "english");
    assert_eq!(convo.upload_document(None).await, Err(Rejected::NoFile));
    assert_eq!(convo.session().upload_status(), NO_FILE_SELECTED);
}

#[tokio::test]
async fn upload_sends_file_and_language_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("Language", "french"))
        .and(body_string_contains("filename=\"report.pdf\""))
        .and(body_string_contains("What is your name?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "Got it"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut convo = conversation(&server, "english");
    convo.set_language("french");
    convo
        .upload_document(Some(UploadFile::new(
            "report.pdf",
            b"What is your name?\nWhere do you live?".to_vec(),
        )))
        .await
        .unwrap();

    let session = convo.session();
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.transcript()[0], Message::user("📂 Uploaded: report.pdf"));
    assert_eq!(session.transcript()[1], Message::assistant("Got it"));
    assert!(session.upload_status().contains("report.pdf"));
    assert!(!session.in_flight().upload);
}

#[tokio::test]
async fn upload_rejection_reports_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(413).set_body_json(json!({"error": "too large"})))
        .mount(&server)
        .await;

    let mut convo = conversation(&server, "english");
    convo
        .upload_document(Some(UploadFile::new("big.pdf", vec![0; 64])))
        .await
        .unwrap();

    assert!(convo.session().transcript().is_empty());
    assert!(convo.session().upload_status().contains("too large"));
}

#[tokio::test]
async fn upload_to_unreachable_server_reports_generic_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut convo = Conversation::new(AssistantClient::new(&format!("http://{addr}")), "english");
    convo
        .upload_document(Some(UploadFile::new("a.txt", b"q".to_vec())))
        .await
        .unwrap();

    assert_eq!(convo.session().upload_status(), UPLOAD_ERROR);
    assert!(convo.session().transcript().is_empty());
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"reply": "late"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client =
        AssistantClient::with_timeout(&server.uri(), Some(Duration::from_millis(200))).unwrap();

    let err = client.chat("hi", "english").await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout { .. }), "got {err:?}");

    let mut convo = Conversation::new(client, "english");
    convo.submit_message("hi").await.unwrap();
    assert_eq!(convo.session().transcript(), &[Message::user("hi")]);
    assert!(convo.session().notice().unwrap().contains("timed out"));
}

#[tokio::test]
async fn artifact_is_saved_under_link_name() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"reply": "All done", "download_link": "/download/qa_42.txt"}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/qa_42.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Q: Name?\nA: Ada\n"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut convo = conversation(&server, "english");

    let err = convo.download_artifact(dir.path()).await.unwrap_err();
    assert_eq!(err.downcast_ref::<Rejected>(), Some(&Rejected::NoDownload));

    convo.submit_message("Ada").await.unwrap();
    let saved = convo.download_artifact(dir.path()).await.unwrap();

    assert_eq!(saved, dir.path().join("qa_42.txt"));
    assert_eq!(
        std::fs::read_to_string(&saved).unwrap(),
        "Q: Name?\nA: Ada\n"
    );
}

#[tokio::test]
async fn missing_artifact_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download/gone.txt"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "File not found"})))
        .mount(&server)
        .await;

    let client = AssistantClient::new(&server.uri());
    let err = client.download("/download/gone.txt").await.unwrap_err();

    assert_eq!(err.server_error(), Some("File not found"));
}

#[tokio::test]
async fn replaying_against_fresh_client_gives_same_transcript() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "Next question"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "Question 1"})))
        .mount(&server)
        .await;

    async fn run(server: &MockServer) -> Vec<Message> {
        let mut convo = conversation(server, "english");
        convo
            .upload_document(Some(UploadFile::new("form.txt", b"Question 1".to_vec())))
            .await
            .unwrap();
        convo.submit_message("answer one").await.unwrap();
        convo.submit_message("answer two").await.unwrap();
        convo.into_session().transcript().to_vec()
    }

    let first = run(&server).await;
    let second = run(&server).await;
    assert_eq!(first.len(), 6);
    assert_eq!(first, second);
}
