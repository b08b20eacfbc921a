use crate::config::SiteConfig;
use crate::{ConfigError, UrlError};
use url::Url;

/// Resolves a link href to an absolute http(s) URL
///
/// # Rules
///
/// - Already-absolute http(s) links are returned unchanged (byte for byte)
/// - Relative links are joined against `base`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links are rejected
/// - Anything resolving to a non-http(s) scheme is rejected
///
/// # Examples
///
/// ```
/// use cyber_news_scraper::normalize::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com").unwrap();
/// assert_eq!(resolve_link("/news/123", &base).unwrap(), "https://example.com/news/123");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> Result<String, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
        || href.starts_with('#')
    {
        return Err(UrlError::Unsupported(href.to_string()));
    }

    // Absolute links pass through untouched so re-normalizing is a no-op
    if let Ok(absolute) = Url::parse(href) {
        return match absolute.scheme() {
            "http" | "https" => Ok(href.to_string()),
            other => Err(UrlError::InvalidScheme(other.to_string())),
        };
    }

    let joined = base.join(href).map_err(|e| UrlError::Parse(e.to_string()))?;
    match joined.scheme() {
        "http" | "https" => Ok(joined.to_string()),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}

/// Returns the origin relative links of a site are joined against
///
/// Uses `base-url` when configured, otherwise the origin of the listing URL.
pub fn resolve_base(site: &SiteConfig) -> Result<Url, ConfigError> {
    let raw = match &site.base_url {
        Some(base) => base.clone(),
        None => {
            let listing = Url::parse(&site.url).map_err(|e| {
                ConfigError::InvalidUrl(format!("site '{}' url: {}", site.name, e))
            })?;
            listing.origin().ascii_serialization()
        }
    };

    let base = Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("site '{}' base-url: {}", site.name, e)))?;

    if base.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "site '{}' base-url '{}' cannot be used as a base",
            site.name, raw
        )));
    }

    Ok(base)
}
