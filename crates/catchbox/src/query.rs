use crate::decode::{DecodedMessage, decode};
use crate::error::Error;
use crate::identity::Identity;
use crate::ownership::is_owned;
use async_trait::async_trait;
use bytes::Bytes;
use catchbox_api_client::MailboxApiClient;
use catchbox_api_types::{InboxRef, MessageSummary};
use futures::{StreamExt, TryStreamExt};
use regex::Regex;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The read-only view of a mailbox provider that the query
/// engine needs.
#[async_trait]
pub trait MailboxSource: Send + Sync {
    async fn list_messages(&self, inbox: &InboxRef) -> Result<Vec<MessageSummary>, Error>;

    /// Must return [`Error::NotFound`] if `id` is no longer present.
    async fn fetch_message(&self, inbox: &InboxRef, id: &str) -> Result<Bytes, Error>;
}

#[async_trait]
impl MailboxSource for MailboxApiClient {
    async fn list_messages(&self, inbox: &InboxRef) -> Result<Vec<MessageSummary>, Error> {
        Ok(MailboxApiClient::list_messages(self, inbox).await?)
    }

    async fn fetch_message(&self, inbox: &InboxRef, id: &str) -> Result<Bytes, Error> {
        Ok(MailboxApiClient::fetch_message(self, inbox, id).await?)
    }
}

/// The owned messages that matched a subject pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    NoMatch,
    Unique(DecodedMessage),
    Ambiguous(Vec<DecodedMessage>),
}

impl MatchOutcome {
    fn from_matches(mut matches: Vec<DecodedMessage>) -> Self {
        match matches.pop() {
            None => Self::NoMatch,
            Some(msg) if matches.is_empty() => Self::Unique(msg),
            Some(msg) => {
                matches.push(msg);
                Self::Ambiguous(matches)
            }
        }
    }

    /// Collapse into the at-most-one contract of [`MailQuery::find_one`]
    pub fn into_result(self, pattern: &Regex) -> Result<Option<DecodedMessage>, Error> {
        match self {
            Self::NoMatch => Ok(None),
            Self::Unique(msg) => Ok(Some(msg)),
            Self::Ambiguous(matches) => Err(Error::AmbiguousMatch {
                pattern: pattern.as_str().to_string(),
                count: matches.len(),
            }),
        }
    }
}

/// Answers questions about the mail that a single test run caused
/// to be sent to a shared inbox.
///
/// Every query starts from a fresh listing; nothing is cached between
/// calls because other runs are continually adding to the inbox.
pub struct MailQuery<S> {
    source: S,
    inbox: InboxRef,
    identity: Identity,
    fetch_concurrency: usize,
    poll_interval: Duration,
}

impl<S: MailboxSource> MailQuery<S> {
    pub fn new(source: S, inbox: InboxRef, identity: Identity) -> Self {
        Self {
            source,
            inbox,
            identity,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_fetch_concurrency(self, fetch_concurrency: usize) -> Self {
        Self {
            fetch_concurrency: fetch_concurrency.max(1),
            ..self
        }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn inbox(&self) -> &InboxRef {
        &self.inbox
    }

    /// Returns the single owned message whose subject contains a match
    /// for `pattern`, or `None` if there is no such message.
    /// More than one such message is reported as [`Error::AmbiguousMatch`].
    pub async fn find_one(&self, pattern: &Regex) -> Result<Option<DecodedMessage>, Error> {
        self.matches(pattern).await?.into_result(pattern)
    }

    /// Like [`MailQuery::find_one`], but absence is an error too.
    pub async fn expect_one(&self, pattern: &Regex) -> Result<DecodedMessage, Error> {
        self.find_one(pattern).await?.ok_or_else(|| Error::NoMatch {
            pattern: pattern.as_str().to_string(),
        })
    }

    /// Repeats [`MailQuery::find_one`] until it produces a message or
    /// `timeout` elapses. Delivery into the sandbox is asynchronous, so
    /// a test that has just triggered a notification should prefer this.
    /// Errors, including ambiguity, end the wait immediately.
    pub async fn wait_for_one(
        &self,
        pattern: &Regex,
        timeout: Duration,
    ) -> Result<Option<DecodedMessage>, Error> {
        // A timeout too large to represent means wait indefinitely
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(msg) = self.find_one(pattern).await? {
                return Ok(Some(msg));
            }
            let now = Instant::now();
            let nap = match deadline {
                Some(deadline) if now >= deadline => {
                    tracing::debug!(pattern = pattern.as_str(), ?timeout, "gave up waiting");
                    return Ok(None);
                }
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };
            tokio::time::sleep(nap).await;
        }
    }

    /// Classifies the owned messages whose subject matches `pattern`.
    pub async fn matches(&self, pattern: &Regex) -> Result<MatchOutcome, Error> {
        let listing = self.source.list_messages(&self.inbox).await?;
        let listed = listing.len();
        let candidates: Vec<MessageSummary> = listing
            .into_iter()
            .filter(|summary| pattern.is_match(&summary.subject))
            .collect();
        let num_candidates = candidates.len();

        let owned = self.collect_owned(candidates).await?;
        tracing::info!(
            pattern = pattern.as_str(),
            listed,
            candidates = num_candidates,
            owned = owned.len(),
            "subject query"
        );
        Ok(MatchOutcome::from_matches(owned))
    }

    /// Returns every message in the inbox that belongs to this run.
    /// The order is whatever order the fetches completed in.
    pub async fn list_owned(&self) -> Result<Vec<DecodedMessage>, Error> {
        let listing = self.source.list_messages(&self.inbox).await?;
        let listed = listing.len();
        let owned = self.collect_owned(listing).await?;
        tracing::info!(listed, owned = owned.len(), "listed owned messages");
        Ok(owned)
    }

    async fn collect_owned(
        &self,
        candidates: Vec<MessageSummary>,
    ) -> Result<Vec<DecodedMessage>, Error> {
        let owned: Vec<Option<DecodedMessage>> = futures::stream::iter(candidates.iter())
            .map(|summary| self.fetch_if_owned(summary))
            .buffer_unordered(self.fetch_concurrency)
            .try_collect()
            .await?;
        Ok(owned.into_iter().flatten().collect())
    }

    async fn fetch_if_owned(
        &self,
        summary: &MessageSummary,
    ) -> Result<Option<DecodedMessage>, Error> {
        let id = summary.id.as_str();
        let raw = match self.source.fetch_message(&self.inbox, id).await {
            Ok(raw) => raw,
            Err(Error::NotFound { .. }) => {
                tracing::warn!(id, "message was removed before it could be fetched");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let message = decode(id, &raw)?;
        if is_owned(&message, &self.identity) {
            tracing::debug!(id, subject = message.subject.as_str(), "owned");
            Ok(Some(message))
        } else {
            tracing::trace!(id, reply_to = ?message.reply_to, "not owned");
            Ok(None)
        }
    }
}
