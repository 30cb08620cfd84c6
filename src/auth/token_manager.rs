use chrono::Utc;
use oauth2::basic::BasicClient;
use reqwest::blocking::{Client, RequestBuilder};
use std::cell::RefCell;
use std::io::{BufRead, Write};

use crate::auth::client_secret::OAuthAppConfig;
use crate::auth::oauth;
use crate::auth::token_store::{StoredToken, TokenStore};
use crate::error::{Error, Result};

/// Owns the current token and refreshes it through the store when it expires.
pub struct TokenManager<'s> {
    oauth: BasicClient,
    store: &'s dyn TokenStore,
    token: RefCell<StoredToken>,
}

impl<'s> TokenManager<'s> {
    pub fn new(app: &OAuthAppConfig, store: &'s dyn TokenStore, token: StoredToken) -> Result<Self> {
        Ok(Self {
            oauth: oauth::build_client(app)?,
            store,
            token: RefCell::new(token),
        })
    }

    /// Returns a valid access token; refreshes if needed.
    pub fn get_access_token(&self) -> Result<String> {
        let current = self.token.borrow().clone();
        if !current.is_expired(Utc::now()) {
            return Ok(current.access_token);
        }

        let rt = current
            .refresh_token
            .ok_or_else(|| Error::Auth("access token expired and no refresh token stored".into()))?;

        log::info!("Access token expired; refreshing");
        let fresh = oauth::refresh_access_token(&self.oauth, &rt)?;
        if let Err(e) = self.store.save(&fresh) {
            log::warn!("couldn't persist refreshed token: {e}");
        }
        let access = fresh.access_token.clone();
        *self.token.borrow_mut() = fresh;
        Ok(access)
    }
}

/// HTTP client that attaches the delegated token to every request.
pub struct AuthorizedClient<'s> {
    http: Client,
    tokens: TokenManager<'s>,
}

impl<'s> AuthorizedClient<'s> {
    pub fn new(http: Client, tokens: TokenManager<'s>) -> Self {
        Self { http, tokens }
    }

    pub fn get(&self, url: impl reqwest::IntoUrl) -> Result<RequestBuilder> {
        let access = self.tokens.get_access_token()?;
        Ok(self.http.get(url).bearer_auth(access))
    }
}

/// Use the stored token if there is one, otherwise run the interactive flow
/// once and persist its result.
pub fn get_client<'s>(
    app: &OAuthAppConfig,
    store: &'s dyn TokenStore,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<AuthorizedClient<'s>> {
    let token = match store.load() {
        Some(t) => t,
        None => {
            let t = oauth::acquire_interactive(app, input, output)?;
            store.save(&t)?;
            t
        }
    };

    let http = Client::builder().build()?;
    Ok(AuthorizedClient::new(http, TokenManager::new(app, store, token)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth::tests::{TOKEN_BODY, app_config};
    use crate::auth::token_store::MemoryTokenStore;
    use std::io::Cursor;

    fn valid_token() -> StoredToken {
        StoredToken {
            access_token: "ya29.stored".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("1//stored".into()),
            expiry: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }

    #[test]
    fn stored_token_skips_interactive_flow() {
        let mut server = mockito::Server::new();
        let token_mock = server.mock("POST", "/token").expect(0).create();
        let api = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer ya29.stored")
            .with_status(200)
            .create();

        let store = MemoryTokenStore::new(Some(valid_token()));
        let app = app_config(format!("{}/token", server.url()));
        // empty input: the interactive flow would fail if it ran
        let client = get_client(&app, &store, &mut Cursor::new(""), &mut Vec::new()).unwrap();

        client
            .get(format!("{}/ping", server.url()))
            .unwrap()
            .send()
            .unwrap();

        token_mock.assert();
        api.assert();
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn missing_token_runs_interactive_flow_once_and_persists() {
        let mut server = mockito::Server::new();
        let token_mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TOKEN_BODY)
            .expect(1)
            .create();

        let store = MemoryTokenStore::new(None);
        let app = app_config(format!("{}/token", server.url()));
        let mut output = Vec::new();
        get_client(&app, &store, &mut Cursor::new("4/code\n"), &mut output).unwrap();

        token_mock.assert();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.current().unwrap().access_token, "ya29.fresh");
        assert!(!output.is_empty());
    }

    #[test]
    fn expired_token_is_refreshed_and_saved() {
        let mut server = mockito::Server::new();
        let _token_mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TOKEN_BODY)
            .expect(1)
            .create();

        let mut stale = valid_token();
        stale.expiry = Some(Utc::now() - chrono::Duration::minutes(5));
        let store = MemoryTokenStore::new(Some(stale.clone()));
        let app = app_config(format!("{}/token", server.url()));

        let tokens = TokenManager::new(&app, &store, stale).unwrap();
        assert_eq!(tokens.get_access_token().unwrap(), "ya29.fresh");
        // second call uses the cached refreshed token
        assert_eq!(tokens.get_access_token().unwrap(), "ya29.fresh");
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn expired_token_without_refresh_token_fails() {
        let store = MemoryTokenStore::new(None);
        let app = app_config("http://127.0.0.1:9/token".into());
        let mut stale = valid_token();
        stale.refresh_token = None;
        stale.expiry = Some(Utc::now() - chrono::Duration::minutes(5));

        let tokens = TokenManager::new(&app, &store, stale).unwrap();
        assert!(matches!(tokens.get_access_token(), Err(Error::Auth(_))));
    }
}
