// Interactive OAuth2 authorization-code flow with a loopback redirect

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use super::credentials::load_client_secrets;
use super::pkce::PkceChallenge;
use super::refresh::request_token;
use super::types::{ClientSecrets, Credential};

const SUCCESS_PAGE: &str = "<html><body><h1>Authentication complete</h1>\
<p>You may close this window.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h1>Authentication failed</h1>\
<p>Return to the terminal for details.</p></body></html>";

/// Obtains a brand new credential by asking the user for consent
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, scopes: &[String]) -> Result<Credential>;
}

/// Errors raised while waiting on the loopback redirect
#[derive(Error, Debug)]
pub enum AuthFlowError {
    #[error("Timed out waiting for the authorization callback")]
    Timeout,

    #[error("Callback listener stopped before a response arrived")]
    CallbackClosed,

    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error("State mismatch in authorization callback")]
    StateMismatch,

    #[error("Authorization callback did not include a code")]
    MissingCode,

    #[error("Callback listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Query parameters Google appends to the redirect URI
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    fn into_code(self, expected_state: &str) -> Result<String, AuthFlowError> {
        if let Some(error) = self.error {
            return Err(AuthFlowError::Denied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthFlowError::StateMismatch);
        }
        self.code.ok_or(AuthFlowError::MissingCode)
    }
}

/// Installed-application flow: local listener on an ephemeral port,
/// consent URL printed to the terminal, code exchanged at the token endpoint.
pub struct InstalledAppFlow {
    client_secrets_file: PathBuf,
    client: Client,
    callback_timeout: Option<Duration>,
}

/// Consent request whose redirect has not arrived yet
struct PendingAuthorization {
    listener: TcpListener,
    redirect_uri: String,
    state: String,
    pkce: PkceChallenge,
    auth_url: Url,
}

impl InstalledAppFlow {
    pub fn new(client_secrets_file: PathBuf, client: Client, callback_timeout: Option<Duration>) -> Self {
        Self {
            client_secrets_file,
            client,
            callback_timeout,
        }
    }

    /// Bind the loopback listener and build the consent URL for it
    async fn start(&self, secrets: &ClientSecrets, scopes: &[String]) -> Result<PendingAuthorization> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind authorization callback listener")?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}/", port);
        let state = uuid::Uuid::new_v4().simple().to_string();
        let pkce = PkceChallenge::generate()?;

        let auth_url = build_authorization_url(secrets, &redirect_uri, scopes, &state, &pkce.challenge)?;

        tracing::info!("Waiting for authorization callback on port {}", port);

        Ok(PendingAuthorization {
            listener,
            redirect_uri,
            state,
            pkce,
            auth_url,
        })
    }

    /// Wait for the redirect, then trade its code for a credential
    async fn complete(
        &self,
        secrets: &ClientSecrets,
        scopes: &[String],
        pending: PendingAuthorization,
    ) -> Result<Credential> {
        let code = wait_for_code(pending.listener, &pending.state, self.callback_timeout).await?;
        tracing::info!("Authorization code received, exchanging for tokens");

        exchange_code(
            &self.client,
            secrets,
            &code,
            &pending.redirect_uri,
            &pending.pkce.verifier,
            scopes,
        )
        .await
    }
}

#[async_trait]
impl Authorizer for InstalledAppFlow {
    async fn authorize(&self, scopes: &[String]) -> Result<Credential> {
        let secrets = load_client_secrets(&self.client_secrets_file)?;
        let pending = self.start(&secrets, scopes).await?;

        println!();
        println!("Please visit this URL to authorize this application:");
        println!("{}", pending.auth_url);
        println!();

        self.complete(&secrets, scopes, pending).await
    }
}

/// Build the consent URL for the authorization endpoint
fn build_authorization_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    code_challenge: &str,
) -> Result<Url> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
        ],
    )
    .with_context(|| format!("Invalid authorization URI: {}", secrets.auth_uri))
}

/// Exchange an authorization code at the token endpoint.
/// `redirect_uri` must be the one sent in the consent URL.
async fn exchange_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
    scopes: &[String],
) -> Result<Credential> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("code_verifier", code_verifier),
    ];
    let response = request_token(client, &secrets.token_uri, &form)
        .await
        .context("Failed to exchange authorization code")?;

    let mut credential = Credential {
        token: None,
        refresh_token: None,
        token_uri: secrets.token_uri.clone(),
        client_id: Some(secrets.client_id.clone()),
        client_secret: Some(secrets.client_secret.clone()),
        scopes: scopes.to_vec(),
        expiry: None,
    };
    credential.apply_token_response(response);

    if credential.refresh_token.is_none() {
        tracing::warn!("Token endpoint did not issue a refresh token");
    }

    Ok(credential)
}

/// Serve the loopback redirect until the first callback arrives
async fn wait_for_code(
    listener: TcpListener,
    expected_state: &str,
    timeout: Option<Duration>,
) -> Result<String, AuthFlowError> {
    let (tx, mut rx) = mpsc::channel::<CallbackParams>(1);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(callback_handler))
        .with_state(tx);

    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!("Authorization callback listener failed: {}", e);
        }
    });

    let received = match timeout {
        Some(limit) => tokio::time::timeout(limit, rx.recv()).await.ok(),
        None => Some(rx.recv().await),
    };
    let _ = shutdown_tx.send(());

    match received {
        None => Err(AuthFlowError::Timeout),
        Some(None) => Err(AuthFlowError::CallbackClosed),
        Some(Some(params)) => params.into_code(expected_state),
    }
}

async fn callback_handler(
    State(tx): State<mpsc::Sender<CallbackParams>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let ok = params.error.is_none() && params.code.is_some();

    // Only the first callback counts; later ones find the channel full or closed
    if tx.try_send(params).is_err() {
        tracing::debug!("Ignoring extra authorization callback");
    }

    if ok {
        Html(SUCCESS_PAGE)
    } else {
        Html(FAILURE_PAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::super::pkce::compute_code_challenge;
    use super::*;
    use mockito::Matcher;
    use std::collections::HashMap;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    #[test]
    fn test_callback_params_success() {
        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: Some("xyz".to_string()),
            error: None,
        };
        assert_eq!(params.into_code("xyz").unwrap(), "abc");
    }

    #[test]
    fn test_callback_params_state_mismatch() {
        let params = CallbackParams {
            code: Some("abc".to_string()),
            state: Some("other".to_string()),
            error: None,
        };
        assert!(matches!(params.into_code("xyz"), Err(AuthFlowError::StateMismatch)));
    }

    #[test]
    fn test_callback_params_denied() {
        let params = CallbackParams {
            error: Some("access_denied".to_string()),
            ..Default::default()
        };
        let err = params.into_code("xyz").unwrap_err();
        assert_eq!(err.to_string(), "Authorization was denied: access_denied");
    }

    #[test]
    fn test_callback_params_missing_code() {
        let params = CallbackParams {
            state: Some("xyz".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.into_code("xyz"), Err(AuthFlowError::MissingCode)));
    }

    #[test]
    fn test_build_authorization_url() {
        let scopes = vec![
            "https://www.googleapis.com/auth/classroom.courses.readonly".to_string(),
            "https://www.googleapis.com/auth/classroom.rosters".to_string(),
        ];
        let url = build_authorization_url(
            &secrets(),
            "http://localhost:4321/",
            &scopes,
            "state-1",
            "challenge-1",
        )
        .unwrap();

        let pairs: HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-id");
        assert_eq!(pairs["redirect_uri"], "http://localhost:4321/");
        assert_eq!(pairs["state"], "state-1");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["code_challenge"], "challenge-1");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["scope"], scopes.join(" "));
    }

    #[tokio::test]
    async fn test_wait_for_code_receives_callback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let waiter = tokio::spawn(async move {
            wait_for_code(listener, "state-1", Some(Duration::from_secs(10))).await
        });

        let response = reqwest::get(format!(
            "http://127.0.0.1:{}/?code=auth-code&state=state-1&scope=a",
            port
        ))
        .await
        .unwrap();
        assert!(response.status().is_success());

        let code = waiter.await.unwrap().unwrap();
        assert_eq!(code, "auth-code");
    }

    #[tokio::test]
    async fn test_wait_for_code_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = wait_for_code(listener, "state-1", Some(Duration::from_millis(50))).await;
        assert!(matches!(result, Err(AuthFlowError::Timeout)));
    }

    #[tokio::test]
    async fn test_consent_round_trip_exchanges_code() {
        let mut server = mockito::Server::new_async().await;
        let token_secrets = ClientSecrets {
            token_uri: format!("{}/token", server.url()),
            ..secrets()
        };
        let scopes = vec!["scope-a".to_string()];
        let flow = InstalledAppFlow::new(
            PathBuf::from("unused.json"),
            Client::new(),
            Some(Duration::from_secs(10)),
        );

        let pending = flow.start(&token_secrets, &scopes).await.unwrap();
        let pairs: HashMap<String, String> = pending.auth_url.query_pairs().into_owned().collect();
        assert_eq!(pairs["redirect_uri"], pending.redirect_uri);
        assert_eq!(pairs["state"], pending.state);
        assert_eq!(pairs["code_challenge"], compute_code_challenge(&pending.pkce.verifier));
        assert_eq!(pairs["code_challenge_method"], "S256");

        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded("redirect_uri".into(), pairs["redirect_uri"].clone()),
                Matcher::UrlEncoded("code_verifier".into(), pending.pkce.verifier.clone()),
                Matcher::UrlEncoded("client_id".into(), "client-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token": "fresh", "refresh_token": "long-lived",
                    "expires_in": 3599, "scope": "scope-a", "token_type": "Bearer"}"#,
            )
            .create_async()
            .await;

        let callback = format!(
            "{}?code=auth-code&state={}",
            pending.redirect_uri.replace("localhost", "127.0.0.1"),
            pairs["state"]
        );
        let browser = tokio::spawn(async move { reqwest::get(callback).await });

        let cred = flow.complete(&token_secrets, &scopes, pending).await.unwrap();

        mock.assert_async().await;
        assert!(browser.await.unwrap().unwrap().status().is_success());
        assert_eq!(cred.token.as_deref(), Some("fresh"));
        assert_eq!(cred.refresh_token.as_deref(), Some("long-lived"));
        assert_eq!(cred.token_uri, token_secrets.token_uri);
        assert_eq!(cred.client_id.as_deref(), Some("client-id"));
        assert_eq!(cred.client_secret.as_deref(), Some("client-secret"));
        assert_eq!(cred.scopes, scopes);
        assert!(cred.is_valid(chrono::Duration::seconds(60)));
    }

    #[tokio::test]
    async fn test_exchange_code_without_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "short-lived"}"#)
            .create_async()
            .await;
        let token_secrets = ClientSecrets {
            token_uri: format!("{}/token", server.url()),
            ..secrets()
        };

        let cred = exchange_code(
            &Client::new(),
            &token_secrets,
            "auth-code",
            "http://localhost:4321/",
            "verifier",
            &["scope-a".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(cred.token.as_deref(), Some("short-lived"));
        assert!(cred.refresh_token.is_none());
        assert!(cred.expiry.is_none());
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#)
            .create_async()
            .await;
        let token_secrets = ClientSecrets {
            token_uri: format!("{}/token", server.url()),
            ..secrets()
        };

        let err = exchange_code(
            &Client::new(),
            &token_secrets,
            "used-code",
            "http://localhost:4321/",
            "verifier",
            &[],
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Failed to exchange authorization code");
        assert!(format!("{:#}", err).contains("invalid_grant"));
    }
}
