//! Requesting user
//!
//! Authentication happens upstream; the proxy forwards who the user is in
//! request headers.

use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use brick_control::RequestContext;
use brick_types::User;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const SUPERUSER_HEADER: &str = "x-superuser";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> ApiResult<Option<&'a str>> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| ApiError::BadRequest(format!("Header {} is not valid text", name))),
    }
}

/// Build the request context from the identity headers.
pub fn request_context(headers: &HeaderMap) -> ApiResult<RequestContext> {
    let user_id = header(headers, USER_ID_HEADER)?
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {} header", USER_ID_HEADER)))?;

    let mut user = User::new(user_id);
    if let Some(role) = header(headers, USER_ROLE_HEADER)? {
        user = user.with_role(role);
    }
    if let Some(flag) = header(headers, SUPERUSER_HEADER)? {
        if matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
            user = user.superuser();
        }
    }

    let mut ctx = RequestContext::new(user);
    if let Some(correlation_id) = header(headers, CORRELATION_ID_HEADER)? {
        ctx = ctx.with_correlation_id(correlation_id);
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use brick_types::Audience;

    #[test]
    fn test_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("sales"));

        let ctx = request_context(&headers).unwrap();
        assert_eq!(ctx.audience(), Audience::Role("sales".into()));

        headers.insert(SUPERUSER_HEADER, HeaderValue::from_static("true"));
        assert!(request_context(&headers).unwrap().is_superuser());
    }

    #[test]
    fn test_missing_user_is_rejected() {
        let err = request_context(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
