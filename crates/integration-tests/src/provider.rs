use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_server::Handle;
use catchbox::MailboxConfig;
use mail_builder::MessageBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const INBOX_ID: &str = "23170";
pub const API_TOKEN: &str = "fake-api-token";
pub const MAILBOX: &str = "sandbox";

#[derive(Default)]
pub struct ProviderState {
    next_id: u64,
    messages: Vec<(u64, String, Vec<u8>)>,
    /// Listed, but purged by the time anyone fetches them
    vanished: HashSet<u64>,
    pub garbage_listing: bool,
    pub list_requests: usize,
}

/// A stand-in for the hosted sandbox mailbox, serving the same
/// read-only HTTP API over loopback.
pub struct FakeProvider {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<ProviderState>>,
    handle: Handle,
}

impl FakeProvider {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(Mutex::new(ProviderState::default()));

        let app = Router::new()
            .route("/api/v1/inboxes/{inbox_id}/messages", get(list_messages))
            .route(
                "/api/v1/inboxes/{inbox_id}/messages/{id}/body.eml",
                get(fetch_message),
            )
            .layer(Extension(Arc::clone(&state)));

        let handle = Handle::new();

        let socket = TcpListener::bind("127.0.0.1:0")?;
        socket.set_nonblocking(true)?;
        let addr = socket.local_addr()?;

        let server = axum_server::from_tcp(socket);
        let handle_copy = handle.clone();
        tokio::spawn(async move {
            server
                .handle(handle_copy)
                .serve(app.into_make_service())
                .await
                .unwrap();
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    /// A config pointing at this provider, polling quickly
    pub fn config(&self) -> MailboxConfig {
        MailboxConfig::new(INBOX_ID, API_TOKEN, MAILBOX, "smtp-password")
            .with_endpoint(self.url())
            .with_smtp_server("127.0.0.1", 2525)
            .with_poll_interval(Duration::from_millis(50))
    }

    pub fn shutdown(&self) {
        self.handle.shutdown();
    }

    /// Store a message as if it had been delivered over SMTP.
    /// Returns the id it will be listed under.
    pub fn deliver(&self, subject: &str, raw: Vec<u8>) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.messages.push((id, subject.to_string(), raw));
        id.to_string()
    }

    pub fn deliver_notification(&self, subject: &str, reply_to: &str) -> String {
        self.deliver(subject, notification(subject, reply_to))
    }

    pub fn vanish(&self, id: &str) {
        let id: u64 = id.parse().unwrap();
        self.state.lock().unwrap().vanished.insert(id);
    }

    pub fn list_requests(&self) -> usize {
        self.state.lock().unwrap().list_requests
    }
}

impl Drop for FakeProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Build the kind of message that a CI server sends when a build
/// changes state, with `reply_to` as configured by the test run.
pub fn notification(subject: &str, reply_to: &str) -> Vec<u8> {
    MessageBuilder::new()
        .from(("Jenkins", "jenkins@ci.example.com"))
        .to("dev@example.com")
        .reply_to(reply_to)
        .subject(subject)
        .text_body(format!("{subject}\n\nSee the console output for details.\n"))
        .write_to_vec()
        .unwrap()
}

#[derive(Deserialize)]
struct TokenParams {
    #[serde(default)]
    api_token: Option<String>,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "Unauthorized"})),
    )
        .into_response()
}

async fn list_messages(
    Extension(state): Extension<Arc<Mutex<ProviderState>>>,
    Path(inbox_id): Path<String>,
    Query(params): Query<TokenParams>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.list_requests += 1;

    if params.api_token.as_deref() != Some(API_TOKEN) {
        return unauthorized();
    }
    if inbox_id != INBOX_ID {
        return StatusCode::NOT_FOUND.into_response();
    }
    if state.garbage_listing {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }

    // Newest first, like the real thing
    let listing: Vec<serde_json::Value> = state
        .messages
        .iter()
        .rev()
        .map(|(id, subject, raw)| {
            serde_json::json!({
                "id": id,
                "inbox_id": INBOX_ID.parse::<u64>().unwrap(),
                "subject": subject,
                "to_email": "dev@example.com",
                "email_size": raw.len(),
                "is_read": false,
            })
        })
        .collect();
    Json(listing).into_response()
}

async fn fetch_message(
    Extension(state): Extension<Arc<Mutex<ProviderState>>>,
    Path((inbox_id, id)): Path<(String, String)>,
    Query(params): Query<TokenParams>,
) -> Response {
    let state = state.lock().unwrap();

    if params.api_token.as_deref() != Some(API_TOKEN) {
        return unauthorized();
    }
    let Ok(id) = id.parse::<u64>() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if inbox_id != INBOX_ID || state.vanished.contains(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.messages.iter().find(|(candidate, _, _)| *candidate == id) {
        Some((_, _, raw)) => (
            StatusCode::OK,
            [("content-type", "message/rfc822")],
            raw.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
