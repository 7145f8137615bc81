use thiserror::Error;
use url::Url;

/// Errors that can occur while validating a configured endpoint.
#[derive(Error, Debug)]
pub enum UrlError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a source endpoint URL.
///
/// Only `http` and `https` URLs with a host are accepted. Loopback hosts are
/// allowed so that locally mocked sources work in tests.
///
/// # Examples
///
/// ```
/// use headline::util::validate_endpoint;
///
/// assert!(validate_endpoint("https://example.com/feed.xml").is_ok());
/// assert!(validate_endpoint("file:///etc/passwd").is_err());
/// ```
pub fn validate_endpoint(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Extracts the lowercase host of a URL with any leading `www.` removed.
///
/// Returns `None` for unparseable URLs or URLs without a host.
pub fn host_of(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").map(str::to_owned).unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Iterates a host and each parent domain, most specific first:
/// `docs.anthropic.com`, `anthropic.com`, `com`.
pub fn domain_suffixes(host: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(host);
    std::iter::from_fn(move || {
        let current = next?;
        next = current.split_once('.').map(|(_, parent)| parent);
        Some(current)
    })
}
