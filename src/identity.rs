use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderName, web, FromRequest, HttpRequest};

pub const DEFAULT_IDENTITY_HEADER: &str = "x-user-id";

/// Header the caller identity is read from. Registered as app data, falls
/// back to [`DEFAULT_IDENTITY_HEADER`] when missing.
#[derive(Clone, Debug)]
pub struct IdentityHeader(pub HeaderName);

impl Default for IdentityHeader {
    fn default() -> Self {
        Self(HeaderName::from_static(DEFAULT_IDENTITY_HEADER))
    }
}

/// The logged in user issuing the request, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Caller(pub Option<String>);

impl Caller {
    fn from_request_headers(req: &HttpRequest) -> Self {
        let header = req
            .app_data::<web::Data<IdentityHeader>>()
            .map(|h| h.0.clone())
            .unwrap_or_else(|| IdentityHeader::default().0);
        let user = req
            .headers()
            .get(&header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self(user)
    }
}

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Caller::from_request_headers(req)))
    }
}
