//! HTTP server for GitHub webhooks.

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::checker::{CheckOutcome, LinkChecker};
use crate::config::Config;
use crate::github::GitHubClient;
use crate::webhooks::{verify_webhook_signature, WebhookEvent};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Webhook secret; deliveries are unsigned-accepted when absent.
    pub webhook_secret: Option<String>,
    /// Check orchestration over the GitHub client.
    pub checker: Arc<LinkChecker<GitHubClient>>,
}

impl AppState {
    /// Build the state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the GitHub client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = GitHubClient::new(&config.github_api_url, config.github_token.as_deref())
            .context("Failed to create GitHub client")?;

        Ok(Self {
            webhook_secret: config.webhook_secret.clone(),
            checker: Arc::new(LinkChecker::new(client, config)),
        })
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener and serve until the process stops.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server fails.
pub async fn run_server(config: Config) -> Result<()> {
    config.validate()?;

    if config.webhook_secret.is_none() {
        warn!("No WEBHOOK_SECRET configured - webhook signatures will not be verified");
    }
    if config.github_token.is_none() {
        warn!("No GITHUB_TOKEN configured - GitHub API calls will be unauthenticated");
    }

    let app = build_router(AppState::from_config(&config)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(
        port = config.port,
        require_all_linked = config.require_all_linked,
        always_fetch_pr = config.always_fetch_pr,
        "Link check service listening"
    );

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Handle incoming GitHub webhooks.
///
/// This handler:
/// 1. Verifies the webhook signature (if secret configured)
/// 2. Parses the payload by `X-GitHub-Event`
/// 3. Validates the PR and posts the check run
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!(
        delivery_id = %delivery_id,
        event_type = %event_type,
        "Received GitHub webhook"
    );

    if let Some(secret) = &state.webhook_secret {
        let Some(signature) = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
        else {
            warn!("Missing X-Hub-Signature-256 header");
            return Err(StatusCode::UNAUTHORIZED);
        };

        if !verify_webhook_signature(&body, signature, secret) {
            warn!("Invalid webhook signature");
            return Err(StatusCode::UNAUTHORIZED);
        }
        debug!("Webhook signature verified");
    }

    let event = WebhookEvent::parse(event_type, &body).map_err(|e| {
        error!("Failed to parse webhook payload: {e}");
        StatusCode::BAD_REQUEST
    })?;

    match state.checker.handle(&event).await {
        Ok(CheckOutcome::Created {
            check_run_id,
            conclusion,
            title,
        }) => Ok(Json(json!({
            "status": "created",
            "check_run_id": check_run_id,
            "conclusion": conclusion,
            "title": title
        }))),
        Ok(CheckOutcome::Skipped { pr_state }) => Ok(Json(json!({
            "status": "skipped",
            "pr_state": pr_state
        }))),
        Ok(CheckOutcome::Ignored(reason)) => Ok(Json(json!({
            "status": "ignored",
            "reason": reason.as_str()
        }))),
        Err(e) if e.is_bad_request() => {
            warn!(delivery_id = %delivery_id, error = %e, "Rejected webhook payload");
            Err(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            error!(delivery_id = %delivery_id, error = %e, "Failed to process webhook");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}
