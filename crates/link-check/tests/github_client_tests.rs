//! GitHub client tests against a mock API.

use chrono::Utc;
use link_check::github::{CheckRunRequest, ChecksApi, GitHubClient, RepoRef};
use link_check::LinkCheckError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use workitems::Conclusion;

fn repo() -> RepoRef {
    RepoRef::new("thundering-mona", "testing-things")
}

#[tokio::test]
async fn test_get_pull_request_with_null_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/thundering-mona/testing-things/pulls/121"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 121,
            "body": null,
            "state": "open",
            "title": "Add feature"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(&server.uri(), Some("test-token")).unwrap();
    let pr = client.get_pull_request(&repo(), 121).await.unwrap();

    assert!(pr.body.is_none());
    assert_eq!(pr.state.as_deref(), Some("open"));
}

#[tokio::test]
async fn test_create_check_run_posts_completed_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/thundering-mona/testing-things/check-runs"))
        .and(body_partial_json(json!({
            "name": "Azure Boards Link Check",
            "head_branch": "feature",
            "head_sha": "abc123",
            "status": "completed",
            "conclusion": "success",
            "output": { "title": "1 work item linked" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "html_url": "https://github.com/thundering-mona/testing-things/runs/42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(&server.uri(), None).unwrap();
    let request = CheckRunRequest::completed(
        Some("feature".to_string()),
        "abc123".to_string(),
        Utc::now(),
        Conclusion::Success,
        "1 work item linked".to_string(),
        "summary".to_string(),
    );
    let check_run = client.create_check_run(&repo(), &request).await.unwrap();

    assert_eq!(check_run.id, 42);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/thundering-mona/testing-things/pulls/7"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let client = GitHubClient::new(&server.uri(), None).unwrap();
    let err = client.get_pull_request(&repo(), 7).await.unwrap_err();

    match err {
        LinkCheckError::GitHub { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("unexpected error: {other}"),
    }
}
