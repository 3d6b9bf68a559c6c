//! Double-submit CSRF check: unsafe requests must echo the token cookie in a header.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::infrastructure::config::CsrfConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("CSRF cookie not set")]
    MissingCookie,
    #[error("CSRF token missing")]
    MissingToken,
    #[error("CSRF token incorrect")]
    Mismatch,
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "csrf_failed", "reason": self.to_string() })),
        )
            .into_response()
    }
}

pub async fn csrf_protect(
    State(config): State<Arc<CsrfConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let cookie = cookie_value(request.headers(), &config.cookie_name).map(str::to_owned);

    if is_safe(request.method()) {
        let mut response = next.run(request).await;
        if cookie.is_none() {
            issue_cookie(&mut response, &config.cookie_name);
        }
        return response;
    }

    if let Err(err) = verify(request.headers(), cookie.as_deref(), &config) {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            reason = %err,
            "rejected request failing csrf check"
        );
        return err.into_response();
    }
    next.run(request).await
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn verify(headers: &HeaderMap, cookie: Option<&str>, config: &CsrfConfig) -> Result<(), CsrfError> {
    let cookie = cookie.filter(|c| !c.is_empty()).ok_or(CsrfError::MissingCookie)?;
    let token = headers
        .get(config.header_name.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(CsrfError::MissingToken)?;
    if bool::from(token.as_bytes().ct_eq(cookie.as_bytes())) {
        Ok(())
    } else {
        Err(CsrfError::Mismatch)
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

fn issue_cookie(response: &mut Response, name: &str) {
    let token = Uuid::new_v4().simple().to_string();
    let cookie = format!("{name}={token}; Path=/; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}
