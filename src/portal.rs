/// URL handling for the portal: absolutization and portal-page detection

use url::Url;

/// Resolve a link or image reference found on the page.
///
/// - Empty (after trimming) yields `None`
/// - Anything that already parses as an absolute URL is returned as written
/// - Relative references are joined onto `base` (the page origin)
///
/// Examples, with base `https://myapps.microsoft.com`:
/// - `/signin/app1` → `https://myapps.microsoft.com/signin/app1`
/// - `https://x/login` → `https://x/login`
pub fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if Url::parse(raw).is_ok() {
        return Some(raw.to_string());
    }

    base.join(raw).ok().map(|url| url.to_string())
}

/// True when `url` points at one of the portal hosts
pub fn is_portal_url(url: &str, portal_hosts: &[String]) -> bool {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_lowercase()))
        .map_or(false, |host| {
            portal_hosts.iter().any(|portal| portal.eq_ignore_ascii_case(&host))
        })
}

/// Origin of a page location, used as the base for relative references
pub fn page_origin(location: &str) -> Option<Url> {
    let parsed = Url::parse(location).ok()?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return None;
    }
    Url::parse(&origin.ascii_serialization()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://myapps.microsoft.com").unwrap()
    }

    fn hosts() -> Vec<String> {
        vec![
            "myapps.microsoft.com".to_string(),
            "myapplications.microsoft.com".to_string(),
        ]
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(
            resolve_url(&base(), "/signin/app1"),
            Some("https://myapps.microsoft.com/signin/app1".to_string())
        );
        assert_eq!(
            resolve_url(&base(), "signin/app2"),
            Some("https://myapps.microsoft.com/signin/app2".to_string())
        );
    }

    #[test]
    fn test_resolve_keeps_absolute_verbatim() {
        assert_eq!(resolve_url(&base(), "https://x/login"), Some("https://x/login".to_string()));
        assert_eq!(
            resolve_url(&base(), "  https://launcher.myapps.microsoft.com/api/signin/abc  "),
            Some("https://launcher.myapps.microsoft.com/api/signin/abc".to_string())
        );
    }

    #[test]
    fn test_resolve_protocol_relative() {
        assert_eq!(
            resolve_url(&base(), "//cdn.example.com/logo.png"),
            Some("https://cdn.example.com/logo.png".to_string())
        );
    }

    #[test]
    fn test_resolve_empty() {
        assert_eq!(resolve_url(&base(), ""), None);
        assert_eq!(resolve_url(&base(), "   "), None);
    }

    #[test]
    fn test_is_portal_url() {
        assert!(is_portal_url("https://myapps.microsoft.com/", &hosts()));
        assert!(is_portal_url("https://MyApps.Microsoft.com/?tenant=contoso", &hosts()));
        assert!(is_portal_url("https://myapplications.microsoft.com/apps", &hosts()));
        assert!(!is_portal_url("https://myapps.microsoft.com.evil.example/", &hosts()));
        assert!(!is_portal_url("https://www.google.com/search?q=myapps.microsoft.com", &hosts()));
        assert!(!is_portal_url("chrome://extensions", &hosts()));
        assert!(!is_portal_url("", &hosts()));
    }

    #[test]
    fn test_page_origin() {
        assert_eq!(
            page_origin("https://myapps.microsoft.com/contoso.com?tab=all#top"),
            Some(base())
        );
        assert_eq!(
            page_origin("http://localhost:3000/apps"),
            Some(Url::parse("http://localhost:3000").unwrap())
        );
        assert_eq!(page_origin("about:blank"), None);
    }
}
