use url::{ParseError, Url};

const NAVIGATIONAL_SCHEMES: &[&str] = &["http", "https", "mailto"];
const RESOURCE_SCHEMES: &[&str] = &["http", "https"];

/// Whether `url` is safe as a link target: `http`, `https`, `mailto`, or a relative reference.
pub fn is_navigational_url(url: &str) -> bool {
    has_scheme_in(url, NAVIGATIONAL_SCHEMES)
}

/// Whether `url` is safe as an embedded resource: `http`, `https`, or a relative reference.
pub fn is_resource_url(url: &str) -> bool {
    has_scheme_in(url, RESOURCE_SCHEMES)
}

// `Url::parse` only accepts absolute URLs, so a reference without a scheme comes back as
// `RelativeUrlWithoutBase`. Every other failure means the string isn't a URI at all.
fn has_scheme_in(url: &str, schemes: &[&str]) -> bool {
    match Url::parse(url) {
        Ok(parsed) => schemes.contains(&parsed.scheme()),
        Err(ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}
