use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::auth::client_secret::{GMAIL_READONLY_SCOPE, load_client_config};
use crate::auth::{TokenStore, get_client};
use crate::compose::compose_summary;
use crate::config::load_config;
use crate::error::{Error, Result};
use crate::mail::{GmailClient, MailSearch};
use crate::sms::{SendResult, TwilioClient};

/// Where the three local files live.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config: PathBuf,
    pub credentials: PathBuf,
    pub token: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.json"),
            credentials: PathBuf::from("credentials.json"),
            token: PathBuf::from("token.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub query: String,
    pub phone: String,
    pub user: String,
    pub include_previews: bool,
    /// Turn a rejected or failed send into an error.
    pub fail_on_send_error: bool,
    pub paths: Paths,
}

#[derive(Debug)]
pub enum RunOutcome {
    NoMatches,
    Sent { matches: usize, result: SendResult },
    SendFailed { matches: usize, reason: String },
}

/// One search-and-notify run.
pub fn run(
    opts: &RunOptions,
    store: &dyn TokenStore,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<RunOutcome> {
    let cfg = load_config(&opts.paths.config)?;
    let app = load_client_config(&opts.paths.credentials, GMAIL_READONLY_SCOPE)?;

    let http = get_client(&app, store, input, output)?;
    let gmail = GmailClient::new(http, cfg.gmail.base_url.clone());

    let messages = gmail.search(&opts.user, &opts.query)?;
    if messages.is_empty() {
        return Ok(RunOutcome::NoMatches);
    }

    let body = compose_summary(
        &gmail,
        &opts.user,
        &opts.query,
        &messages,
        opts.include_previews,
    )?;

    let twilio = TwilioClient::new(cfg.twilio)?;
    let matches = messages.len();
    match twilio.send(&opts.phone, &body) {
        Ok(SendResult::Rejected { status, message }) if opts.fail_on_send_error => {
            Err(Error::Sms(format!(
                "twilio rejected the message with {status}{}",
                message.map(|m| format!(": {m}")).unwrap_or_default()
            )))
        }
        Ok(result) => Ok(RunOutcome::Sent { matches, result }),
        Err(e) if opts.fail_on_send_error => Err(e),
        Err(e) => {
            log::warn!("{e}");
            Ok(RunOutcome::SendFailed {
                matches,
                reason: e.to_string(),
            })
        }
    }
}
