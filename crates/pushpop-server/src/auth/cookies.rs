use axum::http::{header, HeaderMap};

pub const SESSION_COOKIE: &str = "pp_session";
pub const WIZARD_COOKIE: &str = "wizard_token";

const WIZARD_MAX_AGE_SECS: u64 = 24 * 3600;

/// Read one cookie value from the request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .find_map(|c| c.trim().strip_prefix(prefix.as_str()).map(str::to_string))
        .filter(|v| !v.is_empty())
}

fn build_cookie(name: &str, value: &str, max_age: u64, https: bool) -> String {
    let secure = if https { "; Secure" } else { "" };
    format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure}")
}

pub fn session_cookie(token: &str, https: bool, session_days: u32) -> String {
    build_cookie(
        SESSION_COOKIE,
        token,
        u64::from(session_days) * 86_400,
        https,
    )
}

pub fn clear_session_cookie(https: bool) -> String {
    build_cookie(SESSION_COOKIE, "", 0, https)
}

pub fn wizard_cookie(token: &str, https: bool) -> String {
    build_cookie(WIZARD_COOKIE, token, WIZARD_MAX_AGE_SECS, https)
}

pub fn clear_wizard_cookie(https: bool) -> String {
    build_cookie(WIZARD_COOKIE, "", 0, https)
}
