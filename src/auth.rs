//! Login, grant-code retrieval and token exchange.
//!
//! The flow walks from unauthenticated through grant-code-obtained to
//! authenticated;
//! a stored expiry in the past means Expired and the caller re-runs the
//! flow. Invalid credentials do not produce an error body anywhere: the
//! authorize endpoint simply omits the grant-code header, so that case is
//! an expected `Ok(None)` rather than an error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use std::future::Future;
use tracing::{debug, warn};

use crate::api::VueClient;
use crate::credentials::CredentialUpdate;
use crate::errors::{VueError, LOGIN_FAILED_MESSAGE, NO_CREDENTIALS_MESSAGE};
use crate::session::{Method, Payload};

const LOGIN_URL: &str = "https://auth.api.sonyentertainmentnetwork.com/login.do";
const AUTHORIZE_URL: &str = "https://auth.api.sonyentertainmentnetwork.com/2.0/oauth/authorize";
const TOKEN_URL: &str =
    "https://sentv-user-auth.totsuko.tv/sentv_user_auth/ws/web/oauth2/token";

const CLIENT_ID: &str = "dee6a88d-c3be-4e17-aec5-1018514cee40";
const REDIRECT_URI: &str =
    "https://vue.playstation.com/watch/html/auth-redirect.html?requestId=mlbam";

/// The grant code is delivered in this response header, not in a body field.
const GRANT_CODE_HEADER: &str = "x-np-grant-code";

const LOGIN_PARAMS_BLOB: &str = "request_locale=en_US&request_theme=liquid&disableLinks=SENLink";

impl VueClient {
    /// Run the complete login flow: identity login, grant code, token
    /// exchange. Persists the grant code and session expiry on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), VueError> {
        if username.is_empty() || password.is_empty() {
            return Err(VueError::Auth(NO_CREDENTIALS_MESSAGE.to_string()));
        }

        self.login_to_account(username, password).await?;

        match self.request_grant_code().await? {
            Some(code) => {
                self.credentials().save(CredentialUpdate {
                    code: Some(code),
                    ..Default::default()
                })?;
                self.authenticate().await
            }
            None => Err(VueError::Auth(LOGIN_FAILED_MESSAGE.to_string())),
        }
    }

    /// Post the account credentials to the identity endpoint. The response
    /// body carries nothing useful; success shows up as session cookies.
    async fn login_to_account(&self, username: &str, password: &str) -> Result<(), VueError> {
        let payload = [
            ("params", BASE64.encode(LOGIN_PARAMS_BLOB)),
            ("j_username", username.to_string()),
            ("rememberSignIn", "on".to_string()),
            ("j_password", password.to_string()),
        ];
        self.session()
            .request(Method::Post, LOGIN_URL, Some(Payload::Params(&payload)), None)
            .await?;
        Ok(())
    }

    /// Ask the authorize endpoint for a grant code.
    ///
    /// `Ok(None)` means the header was absent, the expected outcome of
    /// invalid credentials, not a fault.
    pub async fn request_grant_code(&self) -> Result<Option<String>, VueError> {
        let params = [
            ("client_id", CLIENT_ID.to_string()),
            ("redirect_uri", REDIRECT_URI.to_string()),
            ("response_type", "code".to_string()),
            ("scope", "psn:s2s".to_string()),
            ("prompt", "none".to_string()),
        ];
        let response = self
            .session()
            .request(Method::Get, AUTHORIZE_URL, Some(Payload::Params(&params)), None)
            .await?;

        match response.headers().get(GRANT_CODE_HEADER) {
            Some(value) => {
                let code = value
                    .to_str()
                    .map_err(|_| VueError::MissingField(GRANT_CODE_HEADER))?;
                Ok(Some(code.to_string()))
            }
            None => {
                debug!("authorize response carried no grant code header; login likely failed");
                Ok(None)
            }
        }
    }

    /// Exchange the stored grant code for a session; persists the returned
    /// expiry date on `AUTHENTICATED`, fails with the vendor message on
    /// any other status.
    async fn authenticate(&self) -> Result<(), VueError> {
        let credentials = self.credentials().load()?;
        let code = credentials.code.ok_or(VueError::MissingField("code"))?;

        let params = [
            ("device_type_id", "ipad".to_string()),
            ("device_id", credentials.device_id),
            ("code", code),
            ("issuer_id", "4".to_string()),
        ];

        let document: TokenDocument = match self
            .fetch_json(Method::Get, TOKEN_URL, Some(Payload::Params(&params)), None)
            .await
        {
            Ok(document) => document,
            // Token exchange failures are login failures, whatever the
            // vendor called them in the envelope.
            Err(VueError::Vendor { message }) => return Err(VueError::Auth(message)),
            Err(other) => return Err(other),
        };

        if document.body.status == "AUTHENTICATED" {
            let expiry_date = document
                .body
                .expiry_date
                .ok_or(VueError::MissingField("body.expiry_date"))?;
            self.credentials().save(CredentialUpdate {
                expiry_date: Some(expiry_date),
                ..Default::default()
            })?;
            Ok(())
        } else {
            Err(VueError::Auth(format!(
                "Unexpected authentication status: {}",
                document.body.status
            )))
        }
    }

    /// Whether the stored session expiry is still in the future.
    pub fn is_session_valid(&self) -> Result<bool, VueError> {
        Ok(self.credentials().load()?.is_valid_at(Utc::now()))
    }

    /// Run `operation`; when it fails with a recoverable vendor error
    /// (geo-location change, stale subscription info), re-run the login
    /// flow once and retry the operation exactly once. All other errors
    /// surface unchanged.
    pub async fn with_reauth<T, F, Fut>(
        &self,
        username: &str,
        password: &str,
        operation: F,
    ) -> Result<T, VueError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, VueError>>,
    {
        match operation().await {
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "recoverable vendor error; re-authenticating and retrying once");
                self.login(username, password).await?;
                operation().await
            }
            other => other,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenDocument {
    body: TokenBody,
}

#[derive(Debug, serde::Deserialize)]
struct TokenBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    expiry_date: Option<String>,
}
