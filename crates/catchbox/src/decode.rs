use mailparse::{MailAddr, MailHeaderMap, ParsedMail, SingleInfo};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to decode message {id}: {reason}")]
pub struct DecodeError {
    pub id: String,
    pub reason: String,
}

/// A message fetched from the inbox, reduced to the parts that
/// tests make assertions against.
///
/// Constructed fresh for every query; the inbox changes underneath
/// us, so these are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMessage {
    /// The provider's id for the message
    pub id: String,
    /// Decoded Subject; empty if the header is absent
    pub subject: String,
    /// Addresses from Reply-To, in header order
    pub reply_to: Vec<String>,
    pub from: Vec<String>,
    pub to: Vec<String>,
    /// Decoded text of the most relevant text part
    pub body: String,
    /// All headers, in order, with decoded values
    pub headers: Vec<(String, String)>,
}

impl DecodedMessage {
    /// Returns the first value of the named header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Parse the raw content of message `id`.
pub fn decode(id: &str, raw: &[u8]) -> Result<DecodedMessage, DecodeError> {
    let err = |reason: String| DecodeError {
        id: id.to_string(),
        reason,
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(err("message is empty".to_string()));
    }

    let parsed = mailparse::parse_mail(raw).map_err(|e| err(format!("{e:#}")))?;
    if parsed.headers.is_empty() {
        return Err(err("message has no headers".to_string()));
    }

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .unwrap_or_default();
    let headers = parsed
        .headers
        .iter()
        .map(|h| (h.get_key(), h.get_value()))
        .collect();
    let body = text_body(&parsed).map_err(|e| err(format!("reading body: {e:#}")))?;

    Ok(DecodedMessage {
        id: id.to_string(),
        subject,
        reply_to: address_list(id, &parsed, "Reply-To"),
        from: address_list(id, &parsed, "From"),
        to: address_list(id, &parsed, "To"),
        body,
        headers,
    })
}

/// Extracts the addresses of an address header. Absent or
/// unparseable headers produce an empty list.
fn address_list(id: &str, parsed: &ParsedMail, name: &str) -> Vec<String> {
    let Some(header) = parsed.headers.get_first_header(name) else {
        return vec![];
    };

    match mailparse::addrparse_header(header) {
        Ok(list) => {
            let mut result = vec![];
            for addr in list.iter() {
                match addr {
                    MailAddr::Single(info) => result.push(render_address(info)),
                    MailAddr::Group(group) => {
                        result.extend(group.addrs.iter().map(render_address))
                    }
                }
            }
            result
        }
        Err(err) => {
            tracing::debug!(id, header = name, "ignoring unparseable address header: {err:#}");
            vec![]
        }
    }
}

fn render_address(info: &SingleInfo) -> String {
    match &info.display_name {
        Some(name) => format!("\"{}\" <{}>", name.replace('"', "\\\""), info.addr),
        None => info.addr.clone(),
    }
}

fn text_body(parsed: &ParsedMail) -> Result<String, mailparse::MailParseError> {
    if let Some(part) = find_part(parsed, &|mime: &str| mime == "text/plain")
        .or_else(|| find_part(parsed, &|mime: &str| mime.starts_with("text/")))
    {
        return part.get_body();
    }
    parsed.get_body()
}

/// Depth first search for the first leaf part whose mime type satisfies `pred`
fn find_part<'a>(
    part: &'a ParsedMail<'a>,
    pred: &dyn Fn(&str) -> bool,
) -> Option<&'a ParsedMail<'a>> {
    if part.subparts.is_empty() {
        return pred(&part.ctype.mimetype.to_ascii_lowercase()).then_some(part);
    }
    part.subparts.iter().find_map(|sub| find_part(sub, pred))
}
