//! Tagged secret metadata
//!
//! Wire format (inside each persisted authorization):
//! ```text
//! {"$Type": <discriminator>, "$Value": { ...kind-specific payload... }}
//! ```
//!
//! | kind                  | $Type | $Value                     |
//! |-----------------------|-------|----------------------------|
//! | Password              | 1     | `{}`                       |
//! | RsaKeyFromCertificate | 2     | `{"Thumbprint": "..."}`    |
//! | PasskeyHmacSecret     | 3     | `{"CredentialId": "b64"}`  |

use aegis_crypto::envelope::base64_bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The kinds of secret an authorization can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    Password,
    RsaKeyFromCertificate,
    PasskeyHmacSecret,
}

/// Static kind ↔ discriminator mapping. Discriminators are persisted and
/// must never be renumbered.
const KIND_TABLE: [(SecretKind, u32, &str); 3] = [
    (SecretKind::Password, 1, "Password"),
    (SecretKind::RsaKeyFromCertificate, 2, "RsaKeyFromCertificate"),
    (SecretKind::PasskeyHmacSecret, 3, "PasskeyHmacSecret"),
];

impl SecretKind {
    pub fn discriminator(self) -> u32 {
        KIND_TABLE
            .iter()
            .find(|(kind, _, _)| *kind == self)
            .map(|(_, disc, _)| *disc)
            .unwrap_or_default()
    }

    pub fn from_discriminator(disc: u32) -> Option<Self> {
        KIND_TABLE
            .iter()
            .find(|(_, d, _)| *d == disc)
            .map(|(kind, _, _)| *kind)
    }

    pub fn name(self) -> &'static str {
        KIND_TABLE
            .iter()
            .find(|(kind, _, _)| *kind == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("Unknown")
    }
}

/// What kind of secret produced a user key, and how to ask for it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretMetadata {
    Password,
    /// Key material extracted from a certificate's private key
    RsaKeyFromCertificate { thumbprint: String },
    /// WebAuthn hmac-secret output of a platform passkey
    PasskeyHmacSecret { credential_id: Vec<u8> },
}

impl SecretMetadata {
    pub fn kind(&self) -> SecretKind {
        match self {
            Self::Password => SecretKind::Password,
            Self::RsaKeyFromCertificate { .. } => SecretKind::RsaKeyFromCertificate,
            Self::PasskeyHmacSecret { .. } => SecretKind::PasskeyHmacSecret,
        }
    }
}

impl std::fmt::Display for SecretMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        match self {
            Self::Password => f.write_str("password"),
            Self::RsaKeyFromCertificate { thumbprint } => write!(f, "certificate {thumbprint}"),
            Self::PasskeyHmacSecret { credential_id } => {
                write!(f, "passkey {}", URL_SAFE_NO_PAD.encode(credential_id))
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TaggedEnvelope {
    #[serde(rename = "$Type")]
    kind: u32,
    #[serde(rename = "$Value", default)]
    value: serde_json::Value,
}

#[derive(Serialize, Deserialize, Default)]
struct PasswordPayload {}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CertificatePayload {
    thumbprint: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PasskeyPayload {
    #[serde(with = "base64_bytes")]
    credential_id: Vec<u8>,
}

impl Serialize for SecretMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        let value = match self {
            Self::Password => serde_json::to_value(PasswordPayload {}),
            Self::RsaKeyFromCertificate { thumbprint } => serde_json::to_value(CertificatePayload {
                thumbprint: thumbprint.clone(),
            }),
            Self::PasskeyHmacSecret { credential_id } => serde_json::to_value(PasskeyPayload {
                credential_id: credential_id.clone(),
            }),
        }
        .map_err(S::Error::custom)?;

        TaggedEnvelope {
            kind: self.kind().discriminator(),
            value,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let envelope = TaggedEnvelope::deserialize(deserializer)?;
        let kind = SecretKind::from_discriminator(envelope.kind).ok_or_else(|| {
            D::Error::custom(format!("unknown secret kind $Type={}", envelope.kind))
        })?;

        match kind {
            SecretKind::Password => Ok(Self::Password),
            SecretKind::RsaKeyFromCertificate => {
                let payload: CertificatePayload =
                    serde_json::from_value(envelope.value).map_err(D::Error::custom)?;
                Ok(Self::RsaKeyFromCertificate {
                    thumbprint: payload.thumbprint,
                })
            }
            SecretKind::PasskeyHmacSecret => {
                let payload: PasskeyPayload =
                    serde_json::from_value(envelope.value).map_err(D::Error::custom)?;
                Ok(Self::PasskeyHmacSecret {
                    credential_id: payload.credential_id,
                })
            }
        }
    }
}
