//! Secret handling helpers shared by the key and network layers.

pub mod redaction;
pub mod secret;

pub use redaction::{redact_body, redact_url, redact_urls_in};
pub use secret::{private_key_from_hex, vec_to_secret, SecretVec};
