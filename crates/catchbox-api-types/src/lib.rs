use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// A single entry in the inbox listing.
///
/// The provider returns a number of additional fields (sizes,
/// timestamps, recipients); only the ones we route on are kept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub subject: String,
}

/// Identifies an inbox on the provider together with the
/// credential that is required to read it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InboxRef {
    pub inbox_id: String,
    pub api_token: String,
}

impl InboxRef {
    pub fn new(inbox_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            inbox_id: inbox_id.into(),
            api_token: api_token.into(),
        }
    }

    pub fn apply_to_url(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("api_token", &self.api_token);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMessagesV1Request {
    pub page: u32,
}

impl Default for ListMessagesV1Request {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl ListMessagesV1Request {
    pub fn apply_to_url(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("page", &self.page.to_string());
    }
}

/// The provider emits numeric ids, but other deployments
/// (and our own fakes) use strings.
fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct V;

    impl<'de2> serde::de::Visitor<'de2> for V {
        type Value = String;

        fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
            fmt.write_str("a string or integer message id")
        }

        fn visit_u64<E>(self, v: u64) -> Result<String, E>
        where
            E: serde::de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<String, E>
        where
            E: serde::de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_str<E>(self, v: &str) -> Result<String, E>
        where
            E: serde::de::Error,
        {
            Ok(v.to_string())
        }
    }

    d.deserialize_any(V)
}

fn string_or_null<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
