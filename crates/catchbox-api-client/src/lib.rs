use bytes::Bytes;
use catchbox_api_types::{InboxRef, ListMessagesV1Request, MessageSummary};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub use reqwest::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxApiError {
    /// The provider could not be reached, or answered with
    /// an unsuccessful status.
    #[error("transport error: {0}")]
    Transport(String),
    /// The provider answered, but not in the shape we expect.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The message was purged or expired between listing and fetching.
    #[error("message {id} not found")]
    NotFound { id: String },
}

impl MailboxApiError {
    fn transport(err: reqwest::Error) -> Self {
        // The url carries the api token; keep it out of error text
        Self::Transport(format!("{:#}", err.without_url()))
    }
}

/// Read-only client for the sandbox mailbox provider HTTP API.
pub struct MailboxApiClient {
    endpoint: Url,
    timeout: Duration,
}

impl MailboxApiClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn client_builder(&self) -> reqwest::ClientBuilder {
        reqwest::Client::builder().timeout(self.timeout)
    }

    /// Builds `{endpoint}/api/v1/inboxes/{inbox_id}/messages/{tail...}`
    fn inbox_url(&self, inbox: &InboxRef, tail: &[&str]) -> Result<Url, MailboxApiError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                MailboxApiError::Transport(format!(
                    "endpoint {} cannot be used as a base url",
                    self.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "inboxes", inbox.inbox_id.as_str(), "messages"])
            .extend(tail);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, Bytes), MailboxApiError> {
        let response = self
            .client_builder()
            .build()
            .map_err(MailboxApiError::transport)?
            .get(url)
            .send()
            .await
            .map_err(MailboxApiError::transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            MailboxApiError::Transport(format!(
                "request status {}: {}, and failed to read response body: {:#}",
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                err.without_url()
            ))
        })?;
        Ok((status, body))
    }

    fn status_error(status: StatusCode, body: &[u8]) -> MailboxApiError {
        MailboxApiError::Transport(format!(
            "request status {}: {}. Response body: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            String::from_utf8_lossy(body)
        ))
    }

    /// Returns the first page of the inbox listing.
    pub async fn list_messages(
        &self,
        inbox: &InboxRef,
    ) -> Result<Vec<MessageSummary>, MailboxApiError> {
        let mut url = self.inbox_url(inbox, &[])?;
        ListMessagesV1Request::default().apply_to_url(&mut url);
        inbox.apply_to_url(&mut url);

        let (status, body) = self.get(url).await?;
        if !status.is_success() {
            return Err(Self::status_error(status, &body));
        }

        let listing: Vec<MessageSummary> = serde_json::from_slice(&body).map_err(|err| {
            MailboxApiError::Protocol(format!(
                "parsing message listing as json: {err:#}: {}",
                String::from_utf8_lossy(&body)
            ))
        })?;
        tracing::debug!(
            inbox = %inbox.inbox_id,
            count = listing.len(),
            "listed messages"
        );
        Ok(listing)
    }

    /// Returns the raw RFC 5322 content of a message.
    pub async fn fetch_message(
        &self,
        inbox: &InboxRef,
        id: &str,
    ) -> Result<Bytes, MailboxApiError> {
        let mut url = self.inbox_url(inbox, &[id, "body.eml"])?;
        inbox.apply_to_url(&mut url);

        let (status, body) = self.get(url).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(MailboxApiError::NotFound { id: id.to_string() });
        }
        if !status.is_success() {
            return Err(Self::status_error(status, &body));
        }
        tracing::trace!(inbox = %inbox.inbox_id, id, len = body.len(), "fetched message");
        Ok(body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use k9::assert_equal;
    use mockito::{Matcher, Server};

    fn inbox() -> InboxRef {
        InboxRef::new("23170", "tok")
    }

    fn client(server: &Server) -> MailboxApiClient {
        MailboxApiClient::new(Url::parse(&server.url()).unwrap())
    }

    #[tokio::test]
    async fn list_messages() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/inboxes/23170/messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("api_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
    {"id": 11, "subject": "Build failed", "sent_at": "2014-03-01T10:00:00Z"},
    {"id": 12, "subject": "Build fixed"}
]"#,
            )
            .create_async()
            .await;

        let listing = client(&server).list_messages(&inbox()).await.unwrap();
        assert_equal!(listing.len(), 2);
        assert_equal!(listing[0].id, "11");
        assert_equal!(listing[1].subject, "Build fixed");
    }

    #[tokio::test]
    async fn list_messages_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/inboxes/23170/messages")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let err = client(&server).list_messages(&inbox()).await.unwrap_err();
        match err {
            MailboxApiError::Transport(msg) => {
                assert!(msg.contains("500"), "{msg}");
                assert!(msg.contains("oops"), "{msg}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_messages_wrong_shape() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/inboxes/23170/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": "Unauthorized"}"#)
            .create_async()
            .await;

        let err = client(&server).list_messages(&inbox()).await.unwrap_err();
        assert!(matches!(err, MailboxApiError::Protocol(_)), "{err:?}");
    }

    #[tokio::test]
    async fn list_messages_unknown_inbox() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/inboxes/23170/messages")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("no such inbox")
            .create_async()
            .await;

        // Only a vanished message is NotFound; a missing inbox is fatal
        let err = client(&server).list_messages(&inbox()).await.unwrap_err();
        match err {
            MailboxApiError::Transport(msg) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/inboxes/23170/messages/11/body.eml")
            .match_query(Matcher::UrlEncoded("api_token".into(), "tok".into()))
            .with_status(200)
            .with_body("Subject: hello\r\n\r\nbody\r\n")
            .create_async()
            .await;

        let raw = client(&server)
            .fetch_message(&inbox(), "11")
            .await
            .unwrap();
        assert_equal!(&raw[..], b"Subject: hello\r\n\r\nbody\r\n");
    }

    #[tokio::test]
    async fn fetch_vanished_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/inboxes/23170/messages/99/body.eml")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server)
            .fetch_message(&inbox(), "99")
            .await
            .unwrap_err();
        assert_equal!(
            err,
            MailboxApiError::NotFound {
                id: "99".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_provider() {
        // Nothing listens on the discard port on loopback
        let client = MailboxApiClient::new(Url::parse("http://127.0.0.1:9/").unwrap())
            .with_timeout(Duration::from_secs(5));
        let err = client.list_messages(&inbox()).await.unwrap_err();
        match err {
            MailboxApiError::Transport(msg) => assert!(!msg.contains("tok"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
