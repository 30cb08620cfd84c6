use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01";
pub const DEFAULT_GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Contents of `config.json`. Key spelling follows the file:
/// `{"Twilio": {"AccountSID": .., "AuthToken": .., "PhoneNumber": .., "BaseURL": ..}}`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "Twilio", alias = "twilio")]
    pub twilio: TwilioConfig,
    #[serde(rename = "Gmail", alias = "gmail", default)]
    pub gmail: GmailConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TwilioConfig {
    #[serde(rename = "AccountSID", alias = "account_sid")]
    pub account_sid: String,
    #[serde(rename = "AuthToken", alias = "auth_token")]
    pub auth_token: String,
    /// Sending number, used as `From`.
    #[serde(rename = "PhoneNumber", alias = "phone_number")]
    pub phone_number: String,
    #[serde(
        rename = "BaseURL",
        alias = "base_url",
        default = "default_twilio_base_url"
    )]
    pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GmailConfig {
    #[serde(
        rename = "BaseURL",
        alias = "base_url",
        default = "default_gmail_base_url"
    )]
    pub base_url: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            base_url: default_gmail_base_url(),
        }
    }
}

fn default_twilio_base_url() -> String {
    DEFAULT_TWILIO_BASE_URL.to_string()
}

fn default_gmail_base_url() -> String {
    DEFAULT_GMAIL_BASE_URL.to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let s = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("unable to read {}: {e}", path.display())))?;
    parse_config(&s).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

pub fn parse_config(s: &str) -> std::result::Result<Config, serde_json::Error> {
    let mut cfg: Config = serde_json::from_str(s)?;
    // trailing slash would double up when joining paths
    cfg.twilio.base_url = cfg.twilio.base_url.trim_end_matches('/').to_string();
    cfg.gmail.base_url = cfg.gmail.base_url.trim_end_matches('/').to_string();
    Ok(cfg)
}
