//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! User-context endpoints on X require every request to carry an
//! `Authorization: OAuth ...` header signed with the consumer secret and the
//! access token secret. See RFC 5849 section 3.4.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::ExposeSecret;
use sha1::Sha1;

use crate::config::Credentials;
use crate::error::{PlatformError, Result};

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding (unreserved characters pass through)
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Signs requests with a fixed set of user credentials
pub struct OAuthSigner {
    credentials: Credentials,
}

impl OAuthSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Build the `Authorization` header value for a request
    ///
    /// `params` are the request's query (and form body) parameters, unencoded.
    /// `url` must not contain a query string.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_header_with(method, url, params, &nonce, &timestamp)
    }

    /// Same as [`authorization_header`](Self::authorization_header) with a fixed nonce and timestamp
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String> {
        let creds = &self.credentials;
        let mut oauth_params = vec![
            ("oauth_consumer_key", creds.api_key.expose_secret()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", creds.access_token.expose_secret()),
            ("oauth_version", "1.0"),
        ];

        let mut all_params: Vec<(&str, &str)> = oauth_params.clone();
        all_params.extend_from_slice(params);
        let signature = self.signature(method, url, &all_params)?;
        oauth_params.push(("oauth_signature", signature.as_str()));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {}", header))
    }

    fn signature(&self, method: &str, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let base = signature_base_string(method, url, params);
        let key = format!(
            "{}&{}",
            encode(self.credentials.api_secret.expose_secret()),
            encode(self.credentials.access_token_secret.expose_secret())
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| {
            PlatformError::Authentication(format!("Failed to initialize request signer: {}", e))
        })?;
        mac.update(base.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// `METHOD&encoded-url&encoded-sorted-params`
fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    )
}
