//! URL helpers shared by the upload flow and the gradient engine.

use crate::error::ValidationError;

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

/// Drop a leading `http://` or `https://`.
pub fn strip_scheme(url: &str) -> &str {
    url.strip_prefix(HTTPS)
        .or_else(|| url.strip_prefix(HTTP))
        .unwrap_or(url)
}

/// Trim user input and prefix `https://` when no scheme was typed.
pub fn normalize_url(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingUrl);
    }
    if trimmed.starts_with(HTTP) || trimmed.starts_with(HTTPS) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{HTTPS}{trimmed}"))
    }
}

/// The `http://` and `https://` spellings of the same URL, in that order.
pub fn scheme_variants(url: &str) -> (String, String) {
    (url.replacen(HTTPS, HTTP, 1), url.replacen(HTTP, HTTPS, 1))
}

/// Split into `(domain, path)`.
///
/// The domain is the text after the scheme up to the first `/`; the path is
/// whatever follows the first occurrence of the domain in the full string.
pub fn split_url(url: &str) -> (&str, &str) {
    let rest = strip_scheme(url);
    let domain = rest.split('/').next().unwrap_or("");
    // always found: domain is a substring of url
    let start = url.find(domain).map(|i| i + domain.len()).unwrap_or(url.len());
    (domain, &url[start..])
}
