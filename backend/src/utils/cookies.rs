use std::time::Duration;

use axum::http::{header, HeaderMap};

/// The two policies this service issues: `None` for the cross-origin session
/// cookie and `Lax` for the OAuth state cookie that must survive the
/// provider's top-level redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub same_site: SameSite,
}

pub const SESSION_COOKIE_NAME: &str = "user_session";
pub const OAUTH_STATE_COOKIE_NAME: &str = "oauth_state";
pub const COOKIE_PATH: &str = "/";

const EXPIRED_AT: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

pub fn build_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    path: &str,
    options: CookieOptions,
) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
        name,
        value,
        path,
        max_age.as_secs(),
        same_site_value(options.same_site)
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds a cookie that browsers drop immediately. Both `Max-Age=0` and a
/// past `Expires` are sent so older clients honour it as well.
pub fn build_clear_cookie(name: &str, path: &str, options: CookieOptions) -> String {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; Expires={}; HttpOnly; SameSite={}",
        name,
        path,
        EXPIRED_AT,
        same_site_value(options.same_site)
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Looks up a cookie across every `Cookie` header of a request.
pub fn find_request_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| extract_cookie_value(raw, name))
}

fn same_site_value(same_site: SameSite) -> &'static str {
    match same_site {
        SameSite::Lax => "Lax",
        SameSite::None => "None",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn build_cookie_includes_security_attributes() {
        let opts = CookieOptions {
            secure: true,
            same_site: SameSite::None,
        };
        let cookie = build_cookie("user_session", "abc", Duration::from_secs(3600), "/", opts);
        assert!(cookie.starts_with("user_session=abc"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn build_clear_cookie_expires_immediately() {
        let opts = CookieOptions {
            secure: false,
            same_site: SameSite::Lax,
        };
        let cookie = build_clear_cookie("user_session", "/", opts);
        assert!(cookie.starts_with("user_session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn extract_cookie_value_finds_matching_name() {
        let header = "a=1; user_session=token-value; b=2";
        assert_eq!(
            extract_cookie_value(header, "user_session").as_deref(),
            Some("token-value")
        );
        assert!(extract_cookie_value(header, "missing").is_none());
        assert!(extract_cookie_value("user_session=", "user_session").is_none());
    }

    #[test]
    fn find_request_cookie_checks_every_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("user_session=xyz"));
        assert_eq!(
            find_request_cookie(&headers, "user_session").as_deref(),
            Some("xyz")
        );
    }
}
