//! Integration tests for the service façade
//!
//! The full stack runs against a mocked HTTP transport: mirroring engine,
//! Drive connector and a static credential provider.

use async_trait::async_trait;
use bridge_desktop::{FileSecureStore, TokioFileSystem};
use bridge_traits::{
    error::Result as BridgeResult,
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use bytes::Bytes;
use core_auth::StaticTokenProvider;
use core_mirror::{MirrorError, UploadListener};
use core_runtime::config::MirrorConfig;
use core_runtime::events::{CoreEvent, UploadEvent};
use core_service::{CoreDependencies, CoreError, MirrorService};
use mockall::mock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

const SESSION_URI: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable&upload_id=s1";

fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    }
}

fn session_response() -> HttpResponse {
    let mut headers = HashMap::new();
    headers.insert("location".to_string(), SESSION_URI.to_string());
    HttpResponse {
        status: 200,
        headers,
        body: Bytes::new(),
    }
}

fn is_upload_start(req: &HttpRequest) -> bool {
    req.method == HttpMethod::Post
        && req
            .url
            .starts_with("https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable")
}

fn is_folder_create(req: &HttpRequest) -> bool {
    req.method == HttpMethod::Post
        && req
            .url
            .starts_with("https://www.googleapis.com/drive/v3/files?fields=")
}

fn is_permission(req: &HttpRequest) -> bool {
    req.method == HttpMethod::Post && req.url.ends_with("/permissions")
}

#[derive(Default)]
struct Recorder {
    terminal: Mutex<Vec<String>>,
}

impl UploadListener for Recorder {
    fn on_upload_started(&self, _name: &str) {}

    fn on_upload_complete(&self, link: &str, _name: &str) {
        self.terminal.lock().unwrap().push(format!("complete:{}", link));
    }

    fn on_upload_error(&self, message: &str) {
        self.terminal.lock().unwrap().push(format!("error:{}", message));
    }
}

struct Harness {
    _downloads: TempDir,
    service: MirrorService,
}

fn harness(mock_http: MockHttpClient, default_parent: Option<&str>) -> Harness {
    let downloads = tempfile::tempdir().unwrap();
    let mut builder = MirrorConfig::builder()
        .download_dir(downloads.path())
        .client_id("test-client.apps.googleusercontent.com")
        .token_cache_path(downloads.path().join("token.json"));
    if let Some(parent) = default_parent {
        builder = builder.default_parent_id(parent);
    }
    let config = builder.build().unwrap();

    let deps = CoreDependencies::new(
        Arc::new(mock_http),
        Arc::new(TokioFileSystem::new()),
        Arc::new(FileSecureStore::new(downloads.path().join("token.json"))),
    );
    let service = MirrorService::with_credentials(
        config,
        deps,
        Arc::new(StaticTokenProvider::new("test-token")),
    )
    .unwrap();

    Harness {
        _downloads: downloads,
        service,
    }
}

#[tokio::test]
async fn test_single_file_upload_end_to_end() {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .times(1)
        .withf(|req| {
            is_upload_start(req)
                && req.headers.get("Authorization") == Some(&"Bearer test-token".to_string())
                && req.headers.get("X-Upload-Content-Type") == Some(&"application/pdf".to_string())
        })
        .returning(|_| Ok(session_response()));
    mock_http
        .expect_execute()
        .times(1)
        .withf(|req| req.method == HttpMethod::Put && req.url == SESSION_URI)
        .returning(|_| Ok(response(200, r#"{"id": "file-1", "name": "report.pdf"}"#)));
    mock_http
        .expect_execute()
        .times(1)
        .withf(|req| is_permission(req) && req.url.contains("/files/file-1/"))
        .returning(|_| Ok(response(200, r#"{"id": "anyoneWithLink"}"#)));
    mock_http
        .expect_execute()
        .times(1)
        .withf(|req| req.method == HttpMethod::Get && req.url.contains("/files/file-1?"))
        .returning(|_| Ok(response(200, r#"{"id": "file-1", "name": "report.pdf"}"#)));

    let harness = harness(mock_http, Some("parent-root"));
    let request = harness.service.request("501", "report.pdf").unwrap();
    std::fs::create_dir_all(&request.job_dir).unwrap();
    std::fs::write(request.source_path(), b"%PDF").unwrap();

    let mut events = harness.service.subscribe_events();
    let recorder = Recorder::default();
    let outcome = harness.service.upload(&request, &recorder).await.unwrap();

    assert_eq!(
        outcome.link,
        "https://drive.google.com/uc?id=file-1&export=download"
    );
    assert_eq!(
        *recorder.terminal.lock().unwrap(),
        vec![format!("complete:{}", outcome.link)]
    );
    assert!(!request.job_dir.exists());

    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Upload(UploadEvent::Started { .. })
    ));
    match events.recv().await.unwrap() {
        CoreEvent::Upload(UploadEvent::Completed { job_id, link, .. }) => {
            assert_eq!(job_id, "501");
            assert_eq!(link, outcome.link);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_directory_creates_one_shared_folder() {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .times(1)
        .withf(|req| is_folder_create(req))
        .returning(|_| {
            Ok(response(
                200,
                r#"{"id": "folder-1", "name": "Album", "mimeType": "application/vnd.google-apps.folder"}"#,
            ))
        });
    mock_http
        .expect_execute()
        .times(1)
        .withf(|req| is_permission(req))
        .returning(|_| Ok(response(200, "{}")));

    let harness = harness(mock_http, None);
    let request = harness.service.request("502", "Album").unwrap();
    std::fs::create_dir_all(request.source_path()).unwrap();

    let outcome = harness
        .service
        .upload(&request, &Recorder::default())
        .await
        .unwrap();

    assert_eq!(outcome.link, "https://drive.google.com/folderview?id=folder-1");
    assert_eq!(outcome.stats.containers_created, 1);
    assert_eq!(outcome.stats.files_uploaded, 0);
    assert!(!request.job_dir.exists());
}

#[tokio::test]
async fn test_api_failure_is_reported_once() {
    let mut mock_http = MockHttpClient::new();
    mock_http.expect_execute().times(1).returning(|_| {
        Ok(response(
            403,
            r#"{"error": {"code": 403, "message": "The user's Drive storage quota has been exceeded."}}"#,
        ))
    });

    let harness = harness(mock_http, None);
    let request = harness.service.request("503", "notes.txt").unwrap();
    std::fs::create_dir_all(&request.job_dir).unwrap();
    std::fs::write(request.source_path(), b"notes").unwrap();

    let mut events = harness.service.subscribe_events();
    let recorder = Recorder::default();
    let error = harness
        .service
        .upload(&request, &recorder)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CoreError::Mirror(MirrorError::RemoteCall { .. })
    ));
    let terminal = recorder.terminal.lock().unwrap().clone();
    assert_eq!(terminal.len(), 1);
    assert!(terminal[0].contains("quota"));
    assert!(!request.job_dir.exists());

    events.recv().await.unwrap();
    match events.recv().await.unwrap() {
        CoreEvent::Upload(UploadEvent::Failed { name, message, .. }) => {
            assert_eq!(name, "notes.txt");
            assert!(message.contains("quota"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let downloads = tempfile::tempdir().unwrap();
    let mut config = MirrorConfig::builder()
        .download_dir(downloads.path())
        .client_id("client")
        .build()
        .unwrap();
    config.oauth.scopes.clear();

    let deps = CoreDependencies::new(
        Arc::new(MockHttpClient::new()),
        Arc::new(TokioFileSystem::new()),
        Arc::new(FileSecureStore::new(downloads.path().join("token.json"))),
    );
    let result =
        MirrorService::with_credentials(config, deps, Arc::new(StaticTokenProvider::new("t")));

    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[tokio::test]
async fn test_requests_cannot_reach_outside_their_job_dir() {
    let harness = harness(MockHttpClient::new(), None);
    let downloads = harness.service.config().download_dir.clone();
    let sibling = downloads.join("600");
    std::fs::create_dir_all(&sibling).unwrap();
    std::fs::write(sibling.join("movie.mkv"), b"frames").unwrap();

    for job_id in ["", "..", "/tmp/elsewhere", "600/../601"] {
        assert!(
            matches!(
                harness.service.request(job_id, "missing"),
                Err(CoreError::Config(_))
            ),
            "job id {:?} accepted",
            job_id
        );
    }
    assert!(matches!(
        harness.service.request("601", "../600"),
        Err(CoreError::Mirror(MirrorError::InvalidRequest(_)))
    ));

    assert!(sibling.join("movie.mkv").exists());
    assert!(downloads.exists());
}
