use super::canonical::CanonicalOptions;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RSA signature scheme, both with PKCS#1 v1.5 padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// RSA over SHA-1, labelled `RSA` on the wire.
    #[serde(rename = "RSA")]
    RsaSha1,
    /// RSA over SHA-256, labelled `RSA2` on the wire.
    #[serde(rename = "RSA2")]
    RsaSha256,
}

impl SignatureScheme {
    /// Value sent in the `sign_type` parameter.
    pub fn label(&self) -> &'static str {
        match self {
            SignatureScheme::RsaSha1 => "RSA",
            SignatureScheme::RsaSha256 => "RSA2",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SignatureScheme {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RSA" => Ok(SignatureScheme::RsaSha1),
            "RSA2" => Ok(SignatureScheme::RsaSha256),
            other => Err(GatewayError::ValidationError(format!(
                "Unsupported sign_type: {}",
                other
            ))),
        }
    }
}

/// Generation of the acquirer's payment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// `create_direct_pay_by_user` on the mapi gateway: a fixed whitelist of
    /// keys is signed, empty values are dropped, and notifications can be
    /// confirmed server-to-server.
    Legacy,
    /// Open API gateway: business fields travel in a `biz_content` JSON
    /// envelope and every non-reserved key is signed.
    Modern,
}

impl Protocol {
    pub fn canonical_options(&self) -> CanonicalOptions {
        match self {
            Protocol::Legacy => CanonicalOptions::dropping_empty(),
            Protocol::Modern => CanonicalOptions::keeping_empty(),
        }
    }
}
