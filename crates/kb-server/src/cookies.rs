//! Session cookie protocol.
//!
//! A started session is carried by a pair of cookies:
//! - the private cookie (`HttpOnly`) holds the session token
//! - the public cookie holds the username for client-side display
//!
//! Both are `Path=/`, percent-encoded, share the session lifetime as
//! `Max-Age`, and are set and cleared together.

use std::time::Duration;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use axum::response::{IntoResponseParts, ResponseParts};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, CookieJar};

/// Default name of the private token cookie.
pub const DEFAULT_COOKIE_NAME: &str = "knowledge_base";

/// Default name of the public username cookie.
pub const DEFAULT_PUBLIC_COOKIE_NAME: &str = "kb-public";

/// Default cookie lifetime (one year).
pub const DEFAULT_COOKIE_LIFETIME: Duration = Duration::from_secs(3600 * 24 * 365);

/// Cookie naming and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    /// Name of the private (HttpOnly) token cookie.
    pub name: String,
    /// Name of the public (script-readable) username cookie.
    pub public_name: String,
    /// `Max-Age` of both cookies.
    pub lifetime: Duration,
    /// Mark both cookies `Secure`.
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            public_name: DEFAULT_PUBLIC_COOKIE_NAME.to_string(),
            lifetime: DEFAULT_COOKIE_LIFETIME,
            secure: false,
        }
    }
}

impl CookieConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_public_name(mut self, name: impl Into<String>) -> Self {
        self.public_name = name.into();
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// The private cookie carrying `token`.
    pub fn token_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .max_age(max_age(self.lifetime))
            .build()
    }

    /// The public cookie carrying `username`.
    pub fn public_cookie(&self, username: &str) -> Cookie<'static> {
        Cookie::build((self.public_name.clone(), username.to_string()))
            .path("/")
            .secure(self.secure)
            .max_age(max_age(self.lifetime))
            .build()
    }

    /// Blank private cookie that expires immediately.
    pub fn expired_token_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), String::new()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .max_age(CookieDuration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    /// Blank public cookie that expires immediately.
    pub fn expired_public_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.public_name.clone(), String::new()))
            .path("/")
            .secure(self.secure)
            .max_age(CookieDuration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}

fn max_age(lifetime: Duration) -> CookieDuration {
    CookieDuration::seconds(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX))
}

/// Build a jar from the request's `Cookie` headers.
///
/// Values are percent-decoded. Malformed pairs are skipped.
pub fn jar_from_headers(headers: &HeaderMap) -> CookieJar {
    let mut jar = CookieJar::new();
    for value in headers.get_all(COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse_encoded(value.to_owned()).flatten() {
            jar.add_original(cookie);
        }
    }
    jar
}

/// Append a `Set-Cookie` header for every cookie changed in `jar`.
pub fn write_delta(jar: &CookieJar, headers: &mut HeaderMap) {
    for cookie in jar.delta() {
        match HeaderValue::from_str(&cookie.encoded().to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(cookie = cookie.name(), error = %e, "Dropping unencodable cookie");
            }
        }
    }
}

/// Response part that writes a jar's changes as `Set-Cookie` headers.
#[derive(Debug)]
pub struct SetCookies(pub CookieJar);

impl IntoResponseParts for SetCookies {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        write_delta(&self.0, res.headers_mut());
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_cookies(jar: &CookieJar) -> Vec<String> {
        let mut headers = HeaderMap::new();
        write_delta(jar, &mut headers);
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_token_cookie_attributes() {
        let config = CookieConfig::new().with_lifetime(Duration::from_secs(60));
        let mut jar = CookieJar::new();
        jar.add(config.token_cookie("abc"));

        let headers = set_cookies(&jar);
        assert_eq!(headers.len(), 1);
        let header = &headers[0];
        assert!(header.starts_with("knowledge_base=abc"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=60"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn test_public_cookie_is_script_readable() {
        let config = CookieConfig::new();
        let mut jar = CookieJar::new();
        jar.add(config.public_cookie("alice"));

        let header = &set_cookies(&jar)[0];
        assert!(header.starts_with("kb-public=alice"));
        assert!(!header.contains("HttpOnly"));
        assert!(header.contains("Max-Age=31536000"));
    }

    #[test]
    fn test_secure_flag() {
        let config = CookieConfig::new().with_secure(true);
        let mut jar = CookieJar::new();
        jar.add(config.token_cookie("abc"));
        assert!(set_cookies(&jar)[0].contains("Secure"));
    }

    #[test]
    fn test_token_value_is_percent_encoded_and_decoded() {
        let token = "dGVzdA-_dGVzdA==";
        let config = CookieConfig::new();
        let mut jar = CookieJar::new();
        jar.add(config.token_cookie(token));

        let header = &set_cookies(&jar)[0];
        assert!(header.starts_with("knowledge_base=dGVzdA-_dGVzdA%3D%3D"));

        // Echo the pair back as a browser would.
        let pair = header.split(';').next().unwrap();
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_str(pair).unwrap());
        let parsed = jar_from_headers(&request);
        assert_eq!(parsed.get("knowledge_base").unwrap().value(), token);
    }

    #[test]
    fn test_expired_cookies_clear_both() {
        let config = CookieConfig::new();
        let mut jar = CookieJar::new();
        jar.add(config.expired_token_cookie());
        jar.add(config.expired_public_cookie());

        let headers = set_cookies(&jar);
        assert_eq!(headers.len(), 2);
        for header in &headers {
            assert!(header.contains("Max-Age=0"));
            assert!(header.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
            assert!(header.contains("Path=/"));
        }
    }

    #[test]
    fn test_jar_from_headers_reads_multiple() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("knowledge_base=tok; other=1"));
        headers.append(COOKIE, HeaderValue::from_static("kb-public=alice"));

        let jar = jar_from_headers(&headers);
        assert_eq!(jar.get("knowledge_base").unwrap().value(), "tok");
        assert_eq!(jar.get("kb-public").unwrap().value(), "alice");
        assert_eq!(jar.get("other").unwrap().value(), "1");
    }

    #[test]
    fn test_original_cookies_are_not_rewritten() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("knowledge_base=tok"));
        let jar = jar_from_headers(&headers);
        assert!(set_cookies(&jar).is_empty());
    }
}
