//! # Bitbuy Client
//!
//! An authenticated client for the Bitbuy exchange partner API.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation for the CLI
//! - `exchange`: Request signing, the REST client and response types
//! - `utils`: Balance summaries with exact decimal arithmetic

pub mod config;
pub mod exchange;
pub mod utils;

pub use config::Config;
pub use exchange::{BitbuyClient, BitbuyError, Wallet};
