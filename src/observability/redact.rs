//! Endpoint URL redaction for logs, metric labels and error text.
//!
//! Hosted RPC URLs carry the access token in the path or query, so only the
//! scheme, host and port are ever emitted.

/// Characters kept from a value that does not parse as a URL.
const UNPARSED_PREFIX_LEN: usize = 30;

/// `https://host:port/…` for a URL, a short prefix for anything else.
pub fn redact_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(url) if url.has_host() => {
            let mut redacted = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
            if let Some(port) = url.port() {
                redacted.push_str(&format!(":{}", port));
            }
            let has_secret_part = !matches!(url.path(), "" | "/")
                || url.query().is_some()
                || !url.username().is_empty()
                || url.password().is_some();
            if has_secret_part {
                redacted.push_str("/…");
            }
            redacted
        }
        _ => {
            let prefix: String = trimmed.chars().take(UNPARSED_PREFIX_LEN).collect();
            if prefix.len() < trimmed.len() {
                format!("{}…", prefix)
            } else {
                prefix
            }
        }
    }
}

/// Replace every spelling of `raw` in `message` with its redacted form.
///
/// Transport errors quote the request URL, either as configured or in its
/// normalized form (e.g. with a trailing slash).
pub fn scrub_url(message: &str, raw: &str) -> String {
    let label = redact_url(raw);
    let mut scrubbed = message.to_string();
    if let Ok(url) = url::Url::parse(raw.trim()) {
        if !url.as_str().is_empty() {
            scrubbed = scrubbed.replace(url.as_str(), &label);
        }
    }
    if !raw.trim().is_empty() {
        scrubbed = scrubbed.replace(raw.trim(), &label);
    }
    scrubbed
}
