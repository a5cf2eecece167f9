use url::Url;

/// True when `observed` is the redirect target: same scheme, host and path.
///
/// Query and fragment are ignored. Unparsable URLs never match.
pub fn is_redirect(expected: &str, observed: &str) -> bool {
    let (Ok(expected), Ok(observed)) = (Url::parse(expected), Url::parse(observed)) else {
        return false;
    };
    match (expected.host_str(), observed.host_str()) {
        (Some(a), Some(b)) if a == b => {}
        _ => return false,
    }
    expected.scheme() == observed.scheme() && expected.path() == observed.path()
}
