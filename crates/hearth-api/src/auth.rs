// Token exchange
//
// The cloud issues single-use refresh tokens: every successful exchange
// returns a new refresh token and invalidates the one that was sent.
// Callers must persist the returned token before using it again.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::CloudClient;
use crate::error::Error;
use crate::models::TokenResponse;

/// Result of a successful refresh-token exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    /// Replacement refresh token. The previous one is now dead.
    pub refresh_token: SecretString,
    /// Access token lifetime in seconds, as reported by the server.
    pub expires_in_secs: i64,
    pub token_type: Option<String>,
}

impl CloudClient {
    /// Exchange a refresh token for a new access/refresh token pair.
    ///
    /// `POST token/refresh` with `{"refreshToken": "..."}`.
    /// Any 4xx rejection maps to [`Error::Authentication`] because a
    /// rejected refresh token cannot be retried.
    pub async fn refresh_token(&self, refresh_token: &SecretString) -> Result<TokenGrant, Error> {
        let url = self.url("token/refresh")?;
        debug!("exchanging refresh token");

        let body = json!({ "refreshToken": refresh_token.expose_secret() });

        let resp: TokenResponse = match self.post(url, &body).await {
            Ok(resp) => resp,
            Err(Error::SessionExpired) => {
                return Err(Error::Authentication {
                    message: "refresh token rejected (HTTP 401)".into(),
                });
            }
            Err(Error::Api {
                status, message, ..
            }) if (400..500).contains(&status) => {
                return Err(Error::Authentication {
                    message: format!("refresh token rejected (HTTP {status}): {message}"),
                });
            }
            Err(e) => return Err(e),
        };

        if resp.access_token.is_empty() || resp.refresh_token.is_empty() {
            return Err(Error::Authentication {
                message: "token endpoint returned an empty token".into(),
            });
        }

        debug!(expires_in = resp.expires_in, "token exchange successful");
        Ok(TokenGrant {
            access_token: SecretString::from(resp.access_token),
            refresh_token: SecretString::from(resp.refresh_token),
            expires_in_secs: resp.expires_in,
            token_type: resp.token_type,
        })
    }
}
