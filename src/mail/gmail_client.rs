//! Gmail REST client
//!
//! Read-only: `users.messages.list` for search and `users.messages.get` for
//! snippets. Blocking, one request at a time.

use reqwest::StatusCode;
use reqwest::blocking::Response;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::AuthorizedClient;
use crate::domain::email::{MessageDetail, MessageRef};
use crate::error::{Error, Result};
use crate::mail::MailSearch;
use crate::mail::decoders::{decode_html_entities, normalize_snippet};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

pub struct GmailClient<'s> {
    http: AuthorizedClient<'s>,
    base_url: String,
}

impl<'s> GmailClient<'s> {
    pub fn new(http: AuthorizedClient<'s>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("gmail base url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl MailSearch for GmailClient<'_> {
    fn search(&self, user: &str, query: &str) -> Result<Vec<MessageRef>> {
        log::info!("Searching for messages containing: {query}");

        let url = self.endpoint(&["users", user, "messages"])?;
        let mut found = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.http.get(url.clone())?.query(&[("q", query)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let page: ListMessagesResponse = read_json(req.send()?)?;
            found.extend(page.messages);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        log::info!("Number of messages found: {}", found.len());
        Ok(found)
    }

    fn fetch_detail(&self, user: &str, message_id: &str) -> Result<MessageDetail> {
        let url = self.endpoint(&["users", user, "messages", message_id])?;
        let req = self.http.get(url)?.query(&[("format", "minimal")]);
        let msg: GmailMessage = read_json(req.send()?)?;

        Ok(MessageDetail {
            id: msg.id,
            snippet: normalize_snippet(&decode_html_entities(&msg.snippet)),
        })
    }
}

/// A non-200 status alone is only a warning; an error envelope or an
/// undecodable body is an error.
fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status != StatusCode::OK {
        log::warn!("Request returned status code: {status}");
    }

    let body = resp.text()?;
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return Err(Error::MailApi {
            status,
            message: env.error.message,
        });
    }
    if !status.is_success() && body.trim().is_empty() {
        return Err(Error::MailApi {
            status,
            message: "empty response".into(),
        });
    }
    Ok(serde_json::from_str(&body)?)
}
