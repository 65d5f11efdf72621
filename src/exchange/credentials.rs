//! Partner API keypair.

/// Public/private keypair issued by Bitbuy for partner API access.
///
/// The private key is only ever used as HMAC key material. `Debug` output
/// redacts it so credentials can sit inside logged structs.
#[derive(Clone)]
pub struct Credentials {
    public_key: String,
    private_key: String,
}

impl Credentials {
    /// Create credentials from explicit values.
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    /// The public key, sent as the `apikey` query parameter.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Expose the private key for signing.
    ///
    /// Never log or display the return value.
    pub fn expose_private_key(&self) -> &str {
        &self.private_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
