//! Bitbuy partner REST API client.

use crate::config::BitbuyConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, Request, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::credentials::Credentials;
use super::error::BitbuyError;
use super::signer::RequestSigner;
use super::traits::PartnerApi;
use super::types::Wallet;

/// Production origin of the partner API.
pub const PRODUCTION_BASE_URL: &str = "https://partner.bcm.exchange";

/// Wallet listing endpoint.
pub const WALLETS_ENDPOINT: &str = "/api/v1/wallets";

/// Authenticated client for the Bitbuy partner API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct BitbuyClient {
    http: Client,
    credentials: Credentials,
    base_url: String,
}

impl BitbuyClient {
    /// Create a client for the production API.
    ///
    /// Performs no I/O. Fails only if the HTTP client cannot be initialized.
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Result<Self, BitbuyError> {
        Self::with_base_url(public_key, private_key, PRODUCTION_BASE_URL)
    }

    /// Create a client against a custom origin.
    ///
    /// Fails if `base_url` is not an absolute URL or the HTTP client cannot
    /// be initialized.
    pub fn with_base_url(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, BitbuyError> {
        let base_url = base_url.trim_end_matches('/');
        Url::parse(base_url)
            .map_err(|e| BitbuyError::Setup(format!("invalid base URL {}: {}", base_url, e)))?;

        let http = Client::builder()
            .build()
            .map_err(|e| BitbuyError::Setup(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials: Credentials::new(public_key, private_key),
            base_url: base_url.to_string(),
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &BitbuyConfig) -> Result<Self, BitbuyError> {
        Self::with_base_url(
            config.public_key.clone(),
            config.private_key.clone(),
            &config.base_url,
        )
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an unsigned request for `endpoint` relative to the base URL.
    pub fn build_request(&self, method: Method, endpoint: &str) -> Result<Request, BitbuyError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let url = Url::parse(&url)
            .map_err(|e| BitbuyError::Signing(format!("invalid request URL {}: {}", url, e)))?;
        Ok(Request::new(method, url))
    }

    /// Add `apikey`, `stamp` and the `signature` header to `request`.
    pub fn sign_request(&self, request: &mut Request) -> Result<(), BitbuyError> {
        RequestSigner::new(&self.credentials).sign_now(request)
    }

    /// Send a signed request and return the raw body of a 200 response.
    ///
    /// Any other status yields [`BitbuyError::Api`] with the body text as-is.
    #[instrument(
        skip(self, request),
        fields(method = %request.method(), path = %request.url().path())
    )]
    pub async fn execute(&self, request: Request) -> Result<Vec<u8>, BitbuyError> {
        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(BitbuyError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        debug!("Received {} byte response", body.len());
        Ok(body.to_vec())
    }

    /// Signed GET of `endpoint`, decoded as JSON.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<T, BitbuyError> {
        let mut request = self.build_request(Method::GET, endpoint)?;
        self.sign_request(&mut request)?;

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BitbuyError::Cancelled),
            result = self.execute(request) => result?,
        };

        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch all wallet balances.
    #[instrument(skip(self, cancel))]
    pub async fn get_wallets(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Wallet>, BitbuyError> {
        let wallets: Vec<Wallet> = self.get(WALLETS_ENDPOINT, cancel).await?;
        debug!("Fetched {} wallets", wallets.len());
        Ok(wallets)
    }
}

#[async_trait]
impl PartnerApi for BitbuyClient {
    fn venue_name(&self) -> &'static str {
        "Bitbuy"
    }

    async fn get_wallets(&self, cancel: &CancellationToken) -> Result<Vec<Wallet>, BitbuyError> {
        BitbuyClient::get_wallets(self, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::signer::{SignaturePayload, NO_BODY, SIGNATURE_HEADER};
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WALLET_WITHOUT_IDS: &str = r#"[{
        "symbol": "BCH",
        "balance": 2.846220260000000000,
        "reservedBalance": 0,
        "availableBalance": 2.846220260000000000,
        "fiatCurrencySymbol": "CAD",
        "fiatBalance": 456.39,
        "fiatReservedBalance": "0.00",
        "fiatAvailableBalance": "456.39"
    }]"#;

    fn client_for(server: &MockServer) -> BitbuyClient {
        BitbuyClient::with_base_url("PK", "SK", &server.uri()).unwrap()
    }

    async fn mount_wallets(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(WALLETS_ENDPOINT))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_new_uses_production_origin() {
        let client = BitbuyClient::new("PK", "SK").unwrap();
        assert_eq!(client.base_url(), PRODUCTION_BASE_URL);
        assert_eq!(client.credentials().public_key(), "PK");
    }

    #[test]
    fn test_build_request_joins_base_url() {
        let client = BitbuyClient::with_base_url("PK", "SK", "https://staging.test/").unwrap();
        let request = client.build_request(Method::GET, WALLETS_ENDPOINT).unwrap();
        assert_eq!(request.url().as_str(), "https://staging.test/api/v1/wallets");
    }

    #[test]
    fn test_construction_rejects_bad_base_url() {
        let err = BitbuyClient::with_base_url("PK", "SK", "not a url").unwrap_err();
        assert!(matches!(err, BitbuyError::Setup(_)));
    }

    #[test]
    fn test_from_config_uses_configured_origin() {
        let config = BitbuyConfig {
            public_key: "PK".to_string(),
            private_key: "SK".to_string(),
            base_url: "https://staging.test".to_string(),
        };
        let client = BitbuyClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://staging.test");
        assert_eq!(client.credentials().expose_private_key(), "SK");
    }

    #[tokio::test]
    async fn test_get_wallets_decodes_wallet_without_ids() {
        let server = MockServer::start().await;
        mount_wallets(
            &server,
            ResponseTemplate::new(200).set_body_string(WALLET_WITHOUT_IDS),
        )
        .await;

        let wallets = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(wallets.len(), 1);
        let bch = &wallets[0];
        assert!(bch.id.is_none());
        assert!(bch.display_name.is_none());
        assert_eq!(bch.symbol, "BCH");
        assert_eq!(bch.balance, dec!(2.84622026));
        assert_eq!(bch.fiat_balance, dec!(456.39));
        assert_eq!(bch.fiat_available_balance, "456.39");
    }

    #[tokio::test]
    async fn test_get_wallets_empty_array() {
        let server = MockServer::start().await;
        mount_wallets(&server, ResponseTemplate::new(200).set_body_string("[]")).await;

        let wallets = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap();

        assert!(wallets.is_empty());
    }

    #[tokio::test]
    async fn test_get_wallets_sends_auth_params_and_signature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WALLETS_ENDPOINT))
            .and(query_param("apikey", "PK"))
            .and(|req: &wiremock::Request| {
                req.url.query_pairs().any(|(k, _)| k == "stamp")
            })
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_signature_matches_received_request() {
        let server = MockServer::start().await;
        mount_wallets(&server, ResponseTemplate::new(200).set_body_string("[]")).await;

        let client = client_for(&server);
        client.get_wallets(&CancellationToken::new()).await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        let request = &received[0];

        let payload = SignaturePayload {
            path: request.url.path(),
            content_length: NO_BODY,
            query: request.url.query().unwrap(),
        };
        let expected = RequestSigner::new(client.credentials())
            .sign(&payload.to_ordered_json())
            .unwrap();
        let sent = request.headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn test_execute_post_keeps_body_and_signs_its_length() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/echo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let body = r#"{"symbol":"BTC","amount":"0.010"}"#;
        let mut request = client.build_request(Method::POST, "/api/v1/echo").unwrap();
        *request.body_mut() = Some(body.into());
        client.sign_request(&mut request).unwrap();

        let response = client.execute(request).await.unwrap();
        assert_eq!(response, b"ok");

        let received = server.received_requests().await.unwrap();
        let request = &received[0];
        assert_eq!(request.body, body.as_bytes());

        let payload = SignaturePayload {
            path: request.url.path(),
            content_length: body.len() as i64,
            query: request.url.query().unwrap(),
        };
        let expected = RequestSigner::new(client.credentials())
            .sign(&payload.to_ordered_json())
            .unwrap();
        let sent = request.headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn test_non_200_is_api_error_with_raw_body() {
        let server = MockServer::start().await;
        mount_wallets(
            &server,
            ResponseTemplate::new(403).set_body_string(r#"{"error":"bad signature"}"#),
        )
        .await;

        let err = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            BitbuyError::Api { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, r#"{"error":"bad signature"}"#);
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_success_codes_are_errors() {
        let server = MockServer::start().await;
        mount_wallets(&server, ResponseTemplate::new(204)).await;

        let err = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(204));
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        mount_wallets(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

        let err = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BitbuyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_decode_error() {
        let server = MockServer::start().await;
        mount_wallets(
            &server,
            ResponseTemplate::new(200).set_body_string(r#"{"wallets":[]}"#),
        )
        .await;

        let err = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BitbuyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_balance_beyond_decimal_precision_is_decode_error() {
        let server = MockServer::start().await;
        mount_wallets(
            &server,
            ResponseTemplate::new(200).set_body_string(
                WALLET_WITHOUT_IDS.replace("2.846220260000000000,", "123456789012.123456789012345678,"),
            ),
        )
        .await;

        let err = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BitbuyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_null_body_is_decode_error() {
        let server = MockServer::start().await;
        mount_wallets(&server, ResponseTemplate::new(200).set_body_string("null")).await;

        let err = client_for(&server)
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BitbuyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 1 is reserved and nothing listens on it.
        let client = BitbuyClient::with_base_url("PK", "SK", "http://127.0.0.1:1").unwrap();

        let err = client
            .get_wallets(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BitbuyError::Transport(_)));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_request() {
        let server = MockServer::start().await;
        mount_wallets(
            &server,
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(5)),
        )
        .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client.get_wallets(&cancel).await.unwrap_err();
        assert!(matches!(err, BitbuyError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_sends_nothing() {
        let server = MockServer::start().await;
        mount_wallets(&server, ResponseTemplate::new(200).set_body_string("[]")).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client_for(&server).get_wallets(&cancel).await.unwrap_err();
        assert!(matches!(err, BitbuyError::Cancelled));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partner_api_trait_object() {
        let server = MockServer::start().await;
        mount_wallets(
            &server,
            ResponseTemplate::new(200).set_body_string(WALLET_WITHOUT_IDS),
        )
        .await;

        let api: Box<dyn PartnerApi> = Box::new(client_for(&server));
        assert_eq!(api.venue_name(), "Bitbuy");
        let wallets = api.get_wallets(&CancellationToken::new()).await.unwrap();
        assert_eq!(wallets.len(), 1);
    }
}
