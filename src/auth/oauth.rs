use chrono::Utc;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use std::io::{BufRead, Write};

use crate::auth::client_secret::OAuthAppConfig;
use crate::auth::token_store::StoredToken;
use crate::error::{Error, Result};

pub fn build_client(app: &OAuthAppConfig) -> Result<BasicClient> {
    let client_id = ClientId::new(app.client_id.clone());
    let client_secret = app.client_secret.clone().map(ClientSecret::new);

    let auth_url = AuthUrl::new(app.auth_url.clone())?;
    let token_url = TokenUrl::new(app.token_url.clone())?;

    Ok(
        BasicClient::new(client_id, client_secret, auth_url, Some(token_url))
            .set_redirect_uri(RedirectUrl::new(app.redirect_uri.clone())?),
    )
}

/// URL the operator opens to grant offline, read-only access.
pub fn authorization_url(client: &BasicClient, scope: &str) -> url::Url {
    let (auth_url, _csrf_token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(scope.to_string()))
        .add_extra_param("access_type", "offline")
        .url();
    auth_url
}

/// Print the authorization URL, read the code the operator pastes back and
/// exchange it for a token.
pub fn acquire_interactive(
    app: &OAuthAppConfig,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<StoredToken> {
    let client = build_client(app)?;
    let auth_url = authorization_url(&client, &app.scope);

    writeln!(
        output,
        "Go to the following link in your browser then type the authorization code: \n{auth_url}"
    )?;
    output.flush()?;

    let code = read_code(input)?;

    let token = client
        .exchange_code(AuthorizationCode::new(code))
        .request(http_client)
        .map_err(|e| Error::Auth(format!("unable to fetch token from web: {e}")))?;

    Ok(stored_from_response(&token, None))
}

/// Exchange a refresh token for a new access token. The old refresh token is
/// kept when the provider doesn't rotate it.
pub fn refresh_access_token(client: &BasicClient, refresh_token: &str) -> Result<StoredToken> {
    let rt = RefreshToken::new(refresh_token.to_string());
    let token = client
        .exchange_refresh_token(&rt)
        .request(http_client)
        .map_err(|e| Error::Auth(format!("token refresh failed: {e}")))?;

    Ok(stored_from_response(&token, Some(refresh_token)))
}

/// First whitespace-separated word of input; blank lines are skipped.
fn read_code(input: &mut dyn BufRead) -> Result<String> {
    let mut line = String::new();
    loop {
        line.clear();
        let n = input
            .read_line(&mut line)
            .map_err(|e| Error::Auth(format!("unable to read authorization code: {e}")))?;
        if n == 0 {
            return Err(Error::Auth("unable to read authorization code: no input".into()));
        }
        if let Some(code) = line.split_whitespace().next() {
            return Ok(code.to_string());
        }
    }
}

fn stored_from_response(token: &BasicTokenResponse, previous_refresh: Option<&str>) -> StoredToken {
    let expiry = token
        .expires_in()
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .map(|d| Utc::now() + d);

    StoredToken {
        access_token: token.access_token().secret().to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: token
            .refresh_token()
            .map(|r| r.secret().to_string())
            .or_else(|| previous_refresh.map(str::to_string)),
        expiry,
    }
}
