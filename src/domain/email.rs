use serde::Deserialize;

pub type MessageId = String;

/// A search hit: identifiers only, no content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: MessageId,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetail {
    pub id: MessageId,
    pub snippet: String,
}

impl MessageRef {
    pub fn new(id: impl Into<MessageId>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
        }
    }
}
