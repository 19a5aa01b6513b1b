use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{HeaderMap, AUTHORIZATION, COOKIE, SET_COOKIE, USER_AGENT};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt as _;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use vigil_dns_domain::Session;

use crate::errors::{ApiError, RequestTimer};
use crate::state::AppState;

/// Largest request body the SID extraction will buffer.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub enum AuthVerdict {
    /// A live slot in the session table.
    Session { slot: usize, session: Session },
    /// Loopback request with local API authentication disabled.
    Localhost,
    /// No password is configured, authentication is off.
    EmptyPassword,
    Unauthorized,
}

impl AuthVerdict {
    pub fn is_authorized(&self) -> bool {
        !matches!(self, AuthVerdict::Unauthorized)
    }
}

/// Request-scoped authentication facts, with every source made explicit.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub verdict: AuthVerdict,
    pub remote_addr: String,
    pub is_tls: bool,
    pub user_agent: String,
    /// The presented password from HTTP Basic, when any.
    pub basic_password: Option<String>,
    /// Body already consumed for SID extraction, handed back to handlers.
    pub body: bytes::Bytes,
}

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn session_cookie(sid: &str, timeout: u64, secure: bool) -> HeaderValue {
    let cookie = format!(
        "sid={sid}; Path=/; Max-Age={timeout}; SameSite=Lax; HttpOnly{}",
        if secure { "; Secure" } else { "" }
    );
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn delete_cookie() -> HeaderValue {
    HeaderValue::from_static("sid=; Path=/; Max-Age=0; SameSite=Lax; HttpOnly")
}

fn remote_addr_of(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

fn is_tls(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

fn is_loopback(addr: &str) -> bool {
    addr == "127.0.0.1" || addr == "::1" || addr == "localhost"
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}

fn form_value(body: &str, name: &str) -> Option<String> {
    for pair in body.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key == name {
            // Form encoding turns '+' into ' '; the token alphabet is
            // base64, so undo it.
            let decoded = percent_decode(value).replace(' ', "+");
            return Some(decoded);
        }
    }
    None
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = &s[i + 1..i + 3];
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'%');
                i += 1;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Locate the SID. Source priority: form body, JSON body, `sid` /
/// `X-FTL-SID` headers, cookie. The bool is true when the cookie supplied it
/// (which is what makes a CSRF token mandatory on API paths).
fn extract_sid(headers: &HeaderMap, body: &[u8]) -> (Option<String>, bool) {
    if !body.is_empty() {
        let text = String::from_utf8_lossy(body);
        if let Some(sid) = form_value(&text, "sid") {
            debug!("SID from form payload");
            return (Some(sid), false);
        }
        if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
            if let Some(sid) = json.get("sid").and_then(|v| v.as_str()) {
                debug!("SID from JSON payload");
                return (Some(sid.to_string()), false);
            }
        }
    }

    for header in ["sid", "X-FTL-SID"] {
        if let Some(sid) = headers.get(header).and_then(|v| v.to_str().ok()) {
            debug!(header, "SID from header");
            return (Some(sid.to_string()), false);
        }
    }

    if let Some(sid) = cookie_value(headers, "sid") {
        debug!("SID from cookie");
        return (Some(sid), true);
    }

    (None, false)
}

/// Authenticate one request against the session table. `is_api` demands a
/// CSRF token whenever the SID arrived via cookie.
pub async fn authenticate(state: &AppState, req: Request, is_api: bool) -> (Request, AuthContext) {
    let remote_addr = remote_addr_of(&req);
    let (parts, body) = req.into_parts();

    let tls = is_tls(&parts.headers);
    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let basic_password = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(super::credentials::basic_auth_password);

    let bytes = match http_body_util::Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => bytes::Bytes::new(),
    };

    let cfg = state.config.load();
    let now = now_secs();

    let verdict = 'verdict: {
        if !cfg.api.local_api_auth && is_loopback(&remote_addr) {
            break 'verdict AuthVerdict::Localhost;
        }
        if cfg.api.pwhash.is_empty() {
            break 'verdict AuthVerdict::EmptyPassword;
        }

        let (sid, from_cookie) = extract_sid(&parts.headers, &bytes);
        let Some(sid) = sid else {
            debug!("Authentication failed: no SID provided");
            break 'verdict AuthVerdict::Unauthorized;
        };

        let need_csrf = from_cookie && is_api;
        let csrf = parts
            .headers
            .get("X-CSRF-TOKEN")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        if need_csrf && csrf.is_none() {
            debug!("Authentication failed: cookie auth without CSRF token");
            break 'verdict AuthVerdict::Unauthorized;
        }

        match state.sessions.check(
            &sid,
            &remote_addr,
            need_csrf,
            csrf.as_deref(),
            tls,
            now,
            cfg.api.session_timeout,
        ) {
            Some((slot, session)) => AuthVerdict::Session { slot, session },
            None => {
                debug!("Authentication failed: SID invalid or expired");
                AuthVerdict::Unauthorized
            }
        }
    };

    let context = AuthContext {
        verdict,
        remote_addr,
        is_tls: tls,
        user_agent,
        basic_password,
        body: bytes.clone(),
    };

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(context.clone());
    (req, context)
}

/// Layer for every API route except the auth endpoints themselves: reject
/// unauthenticated requests, refresh the session cookie on the way out.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let timer = RequestTimer::now();
    let (mut req, context) = authenticate(&state, req, true).await;
    req.extensions_mut().insert(timer);

    match &context.verdict {
        AuthVerdict::Unauthorized => ApiError::unauthorized()
            .with_timer(&timer)
            .into_response(),
        AuthVerdict::Session { session, .. } => {
            let sid = session.sid.clone();
            let secure = session.tls.login;
            let timeout = state.config.load().api.session_timeout;
            let mut response = next.run(req).await;
            response
                .headers_mut()
                .insert(SET_COOKIE, session_cookie(&sid, timeout, secure));
            response
        }
        _ => next.run(req).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_parsing_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc+def/123; other=1"),
        );
        assert_eq!(cookie_value(&headers, "sid").as_deref(), Some("abc+def/123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn form_sid_restores_plus_signs() {
        // '+' in the token arrives as ' ' after form decoding
        assert_eq!(
            form_value("sid=abc%2Bdef&x=1", "sid").as_deref(),
            Some("abc+def")
        );
        assert_eq!(form_value("sid=abc+def", "sid").as_deref(), Some("abc+def"));
    }

    #[test]
    fn sid_source_priority_is_body_then_header_then_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("sid", HeaderValue::from_static("from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("sid=from-cookie"));

        let (sid, from_cookie) = extract_sid(&headers, br#"{"sid":"from-body"}"#);
        assert_eq!(sid.as_deref(), Some("from-body"));
        assert!(!from_cookie);

        let (sid, from_cookie) = extract_sid(&headers, b"");
        assert_eq!(sid.as_deref(), Some("from-header"));
        assert!(!from_cookie);

        headers.remove("sid");
        let (sid, from_cookie) = extract_sid(&headers, b"");
        assert_eq!(sid.as_deref(), Some("from-cookie"));
        assert!(from_cookie);
    }
}
