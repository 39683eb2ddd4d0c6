//! URL parsing and validation utilities
//!
//! Provides helpers for extracting filenames from URLs and validating URL schemes.

/// URL schemes a source archive may be fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScheme {
    Http,
    Https,
    File,
}

impl UrlScheme {
    /// Get the scheme prefix string
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Http => "http://",
            Self::Https => "https://",
            Self::File => "file://",
        }
    }

    /// Detect the scheme of a URL, if it is one we fetch from.
    pub fn of(url: &str) -> Option<Self> {
        let url_lower = url.to_lowercase();
        [Self::Https, Self::Http, Self::File]
            .into_iter()
            .find(|s| url_lower.starts_with(s.prefix()))
    }
}

/// Validate that a URL uses one of the allowed schemes.
pub fn validate_url_scheme(url: &str, allowed: &[UrlScheme]) -> Result<UrlScheme, String> {
    if let Some(scheme) = UrlScheme::of(url)
        && allowed.contains(&scheme)
    {
        return Ok(scheme);
    }

    let allowed_str: Vec<_> = allowed.iter().map(|s| s.prefix()).collect();
    Err(format!("URL must use one of: {:?}\n  got: {}", allowed_str, url))
}

/// Strip the `file://` prefix from a local URL.
pub fn file_url_path(url: &str) -> Option<&str> {
    url.strip_prefix("file://")
}

/// Extract filename from a URL.
///
/// Handles query strings and fragments, returns "download" as fallback.
pub fn extract_filename(url: &str) -> String {
    // Strip query string and fragment
    let clean_url = url.split('?').next().unwrap_or(url);
    let clean_url = clean_url.split('#').next().unwrap_or(clean_url);

    clean_url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(sanitize_filename)
        .unwrap_or_else(|| "download".to_string())
}

/// Replace characters that are unsafe in filenames.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' | ':' => '_',
            c => c,
        })
        .collect()
}
