use crate::decode::DecodedMessage;
use crate::identity::Identity;

/// Was `message` produced by the run identified by `identity`?
///
/// Only the reply-to addresses are consulted; a message without
/// any is never ours.
pub fn is_owned(message: &DecodedMessage, identity: &Identity) -> bool {
    message
        .reply_to
        .iter()
        .any(|addr| addr.contains(identity.as_str()))
}
