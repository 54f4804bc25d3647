use axum::http::HeaderMap;

pub const SESSION_COOKIE: &str = "crewdash_session";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authentication context of one inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub token: Option<String>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()), ..Default::default() }
    }

    /// Bearer token wins over the session cookie when both are present.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let token = bearer_token(headers).or_else(|| parse_cookie(headers, SESSION_COOKIE));
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .or_else(|| Some(uuid::Uuid::new_v4().to_string()));
        Self { token, request_id }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("authorization")?.to_str().ok()?;
    let (scheme, rest) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") { return None; }
    let t = rest.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie")?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name && v.len() > 1 { return Some(v[1..].to_string()); }
        }
    }
    None
}
