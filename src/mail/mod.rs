pub mod decoders;
pub mod gmail_client;

use crate::domain::email::{MessageDetail, MessageRef};
use crate::error::Result;

pub use gmail_client::GmailClient;

/// Anything that can search a mailbox and fetch message previews.
pub trait MailSearch {
    fn search(&self, user: &str, query: &str) -> Result<Vec<MessageRef>>;
    fn fetch_detail(&self, user: &str, message_id: &str) -> Result<MessageDetail>;
}
