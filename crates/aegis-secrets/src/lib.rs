//! aegis-secrets: where user secrets come from and how they are described
//!
//! The archive engine never talks to a password prompt, a certificate store,
//! or a passkey authenticator directly. A [`SecretProvider`] hands it raw
//! secret bytes plus [`SecretMetadata`] describing which kind of secret it
//! was, and that metadata is stored (in plaintext) with the authorization so
//! the host knows what to ask for on the next unlock.

pub mod metadata;
pub mod provider;

pub use metadata::{SecretKind, SecretMetadata};
pub use provider::{PasswordProvider, ProvidedSecret, RawSecretProvider, SecretProvider};
