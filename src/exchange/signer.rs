//! HMAC-SHA256 request signing for the Bitbuy partner API.
//!
//! Every authenticated request carries two injected query parameters
//! (`apikey`, `stamp`) and a `signature` header. The signature is the base64
//! encoded HMAC-SHA256, keyed by the private key, of a fixed-layout JSON
//! document describing the request:
//!
//! ```text
//! {"path":"/api/v1/wallets","content-length":-1,"query":"apikey=PK&stamp=1700000000000"}
//! ```
//!
//! The server rebuilds the same bytes, so field order, quoting and the query
//! string must match exactly what goes over the wire.
//!
//! Query parameters are sorted by key and escaped like a form query
//! component: unreserved characters (`A-Z a-z 0-9 - _ . ~`) stay as-is,
//! a space becomes `+`, everything else is `%XX`.

use super::credentials::Credentials;
use super::error::BitbuyError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderValue;
use reqwest::{Method, Request, Url};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "signature";

/// Query parameter carrying the public key.
pub const API_KEY_PARAM: &str = "apikey";

/// Query parameter carrying the signing timestamp (ms since epoch).
pub const STAMP_PARAM: &str = "stamp";

/// Content length signed for requests without a body (GET).
pub const NO_BODY: i64 = -1;

/// The three request attributes covered by the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignaturePayload<'a> {
    pub path: &'a str,
    pub content_length: i64,
    pub query: &'a str,
}

impl SignaturePayload<'_> {
    /// Render the payload in the exact byte layout the server verifies.
    ///
    /// Values are embedded verbatim, without JSON escaping.
    pub fn to_ordered_json(&self) -> String {
        format!(
            r#"{{"path":"{}","content-length":{},"query":"{}"}}"#,
            self.path, self.content_length, self.query
        )
    }
}

/// Signs requests with a partner keypair.
pub struct RequestSigner<'a> {
    credentials: &'a Credentials,
}

impl<'a> RequestSigner<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// Compute the base64 HMAC-SHA256 of `message` keyed by the private key.
    pub fn sign(&self, message: &str) -> Result<String, BitbuyError> {
        let key = self.credentials.expose_private_key().as_bytes();
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| BitbuyError::Signing(format!("invalid private key: {}", e)))?;
        mac.update(message.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Sign `request` in place using the current time as the stamp.
    pub fn sign_now(&self, request: &mut Request) -> Result<(), BitbuyError> {
        self.sign_at(request, timestamp_ms())
    }

    /// Sign `request` in place using an explicit stamp.
    ///
    /// Rewrites the URL query to include `apikey` and `stamp`, then attaches
    /// the `signature` header. Any earlier `apikey`/`stamp` pairs are
    /// replaced. The request body is only inspected, never consumed; a body
    /// that cannot be measured leaves the request untouched.
    pub fn sign_at(&self, request: &mut Request, stamp_ms: i64) -> Result<(), BitbuyError> {
        content_length(request)?;

        let query = augmented_query(request.url(), self.credentials.public_key(), stamp_ms);
        request.url_mut().set_query(Some(&query));

        let signature = self.sign(&canonical_payload(request)?)?;

        let value = HeaderValue::from_str(&signature)
            .map_err(|e| BitbuyError::Signing(format!("invalid signature header: {}", e)))?;
        request.headers_mut().insert(SIGNATURE_HEADER, value);

        Ok(())
    }
}

/// The string that gets signed for `request`, built from its current URL and body.
///
/// The query is read back from the URL, since that is exactly what the
/// transport sends.
pub fn canonical_payload(request: &Request) -> Result<String, BitbuyError> {
    let url = request.url();
    let payload = SignaturePayload {
        path: url.path(),
        content_length: content_length(request)?,
        query: url.query().unwrap_or_default(),
    };
    Ok(payload.to_ordered_json())
}

/// Current Unix time in milliseconds.
pub fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Existing query parameters plus `apikey` and `stamp`, canonically encoded.
///
/// Pairs are stably sorted by key, so repeated keys keep their relative order.
fn augmented_query(url: &Url, public_key: &str, stamp_ms: i64) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != API_KEY_PARAM && k != STAMP_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.push((API_KEY_PARAM.to_string(), public_key.to_string()));
    params.push((STAMP_PARAM.to_string(), stamp_ms.to_string()));
    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
        .iter()
        .map(|(k, v)| format!("{}={}", query_escape(k), query_escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Escape a query key or value, encoding spaces as `+`.
fn query_escape(s: &str) -> String {
    urlencoding::encode(s).replace("%20", "+")
}

/// Byte length of the body as it will be transmitted; [`NO_BODY`] for GET.
fn content_length(request: &Request) -> Result<i64, BitbuyError> {
    if request.method() == Method::GET {
        return Ok(NO_BODY);
    }

    let len = match request.body() {
        None => 0,
        Some(body) => body
            .as_bytes()
            .ok_or_else(|| {
                BitbuyError::Signing("error reading out request body: body is a stream".to_string())
            })?
            .len(),
    };

    i64::try_from(len).map_err(|_| BitbuyError::Signing(format!("body too large: {} bytes", len)))
}
