use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// `credentials.json` as downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientRegistration>,
    web: Option<ClientRegistration>,
}

#[derive(Debug, Deserialize)]
struct ClientRegistration {
    client_id: String,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// Everything needed to run the authorization code flow against one provider.
#[derive(Debug, Clone)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scope: String,
}

pub fn load_client_config(path: &Path, scope: &str) -> Result<OAuthAppConfig> {
    let bytes = fs::read(path).map_err(|e| {
        Error::Config(format!(
            "unable to read client secret file {}: {e}",
            path.display()
        ))
    })?;
    parse_client_config(&bytes, scope)
}

pub fn parse_client_config(bytes: &[u8], scope: &str) -> Result<OAuthAppConfig> {
    let file: ClientSecretFile = serde_json::from_slice(bytes)
        .map_err(|e| Error::Config(format!("unable to parse client secret file: {e}")))?;

    let reg = file
        .installed
        .or(file.web)
        .ok_or_else(|| Error::Config("client secret file has no installed or web section".into()))?;

    Ok(OAuthAppConfig {
        client_id: reg.client_id,
        client_secret: reg.client_secret.filter(|s| !s.is_empty()),
        auth_url: reg.auth_uri.unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
        token_url: reg.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        redirect_uri: reg
            .redirect_uris
            .into_iter()
            .next()
            .unwrap_or_else(|| OOB_REDIRECT.to_string()),
        scope: scope.to_string(),
    })
}
