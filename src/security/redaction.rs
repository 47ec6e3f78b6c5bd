// Helpers to keep credentials and upstream payloads out of logs.
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;

static EMBEDDED_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:https?|wss?)://[^\s()<>'"]+"#).expect("Hardcoded regex should always compile")
});

fn dev_print_secrets() -> bool {
    env::var("DEV_PRINT_SECRETS").ok().as_deref() == Some("1")
}

/// Redact a response body unless DEV_PRINT_SECRETS=1 is set in the environment.
/// By default this returns a short placeholder containing only the length.
pub fn redact_body(s: &str) -> String {
    if dev_print_secrets() {
        return s.to_string();
    }
    format!("<redacted len={}>", s.len())
}

/// Mask the last path segment of a provider URL, where the API key lives
/// (`https://eth-mainnet.g.alchemy.com/v2/<key>`).
pub fn redact_url(url: &str) -> String {
    if dev_print_secrets() {
        return url.to_string();
    }
    match url.trim_end_matches('/').rsplit_once('/') {
        Some((base, last)) if !last.is_empty() && !base.ends_with('/') => {
            format!("{}/<redacted>", base)
        }
        _ => url.to_string(),
    }
}

/// Apply [`redact_url`] to every URL embedded in an error message.
pub fn redact_urls_in(text: &str) -> String {
    EMBEDDED_URL.replace_all(text, |caps: &regex::Captures| redact_url(&caps[0])).into_owned()
}
