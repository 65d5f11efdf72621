//! Bitbuy partner API integration.
//!
//! Every request is authenticated by:
//! - `apikey` and `stamp` query parameters
//! - a `signature` header: base64 HMAC-SHA256 over a fixed-layout JSON
//!   description of the path, body length and final query string
//!
//! Only wallet listing is implemented; further endpoints follow the same
//! sign, execute, decode sequence through [`BitbuyClient::get`].

mod client;
mod credentials;
mod error;
pub mod signer;
mod traits;
mod types;

pub use client::{BitbuyClient, PRODUCTION_BASE_URL, WALLETS_ENDPOINT};
pub use credentials::Credentials;
pub use error::BitbuyError;
pub use signer::{RequestSigner, SignaturePayload};
pub use traits::PartnerApi;
pub use types::*;
