//! Marker Comments - Island, portal and suspense boundary metadata.
//!
//! Boundaries travel through the markup stream as comments so a server
//! renderer can emit them verbatim. The program builder and the hydrate
//! interpreter both parse them through this one helper, which keeps the
//! two paths agreeing on the format.

/// A recognized marker comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    IslandStart(String),
    IslandEnd,
    PortalStart(String),
    PortalEnd,
    SuspenseStart(String),
    SuspenseFallback,
    SuspenseEnd,
}

/// Parse a comment body into a marker. Surrounding whitespace is
/// ignored; anything unrecognized is an ordinary comment and yields
/// `None`.
pub fn parse(comment: &str) -> Option<Marker> {
    let body = comment.trim();
    if let Some(name) = body.strip_prefix("island:") {
        return Some(Marker::IslandStart(name.trim().to_string()));
    }
    if body == "/island" {
        return Some(Marker::IslandEnd);
    }
    if let Some(target) = body.strip_prefix("portal:") {
        return Some(Marker::PortalStart(target.trim().to_string()));
    }
    if body == "/portal" {
        return Some(Marker::PortalEnd);
    }
    if let Some(name) = body.strip_prefix("suspense:start") {
        if name.is_empty() || name.starts_with(char::is_whitespace) {
            return Some(Marker::SuspenseStart(name.trim().to_string()));
        }
        return None;
    }
    if body == "suspense:fallback" {
        return Some(Marker::SuspenseFallback);
    }
    if body == "/suspense" {
        return Some(Marker::SuspenseEnd);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markers() {
        assert_eq!(
            parse("island:hero"),
            Some(Marker::IslandStart("hero".into()))
        );
        assert_eq!(
            parse("  portal:modal-root  "),
            Some(Marker::PortalStart("modal-root".into()))
        );
        assert_eq!(
            parse("suspense:start feed"),
            Some(Marker::SuspenseStart("feed".into()))
        );
        assert_eq!(parse("suspense:fallback"), Some(Marker::SuspenseFallback));
        assert_eq!(parse("/island"), Some(Marker::IslandEnd));
        assert_eq!(parse("/portal"), Some(Marker::PortalEnd));
        assert_eq!(parse("/suspense"), Some(Marker::SuspenseEnd));
    }

    #[test]
    fn test_ordinary_comments_are_not_markers() {
        assert_eq!(parse("just a note"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("islander:oops"), None);
    }
}
