use crate::UrlError;
use url::Url;

/// Parses a user-supplied target URL
///
/// The URL must be absolute, use `http` or `https`, and name a host.
/// Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use crawl_explorer::url::parse_target_url;
///
/// assert!(parse_target_url("https://firecrawl.dev").is_ok());
/// assert!(parse_target_url("firecrawl.dev").is_err());
/// ```
pub fn parse_target_url(input: &str) -> Result<Url, UrlError> {
    let url = Url::parse(input.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost),
    }
}
