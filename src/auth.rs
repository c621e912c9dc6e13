//! A coarse authenticated/anonymous gate.
//!
//! There is no account or session model in this service: any request that
//! carries a well-formed HTTP Basic `Authorization` header is treated as
//! authenticated, matching the behavior of the system this was distilled
//! from (whose `check_credentials` callback always returned success). A
//! request with no such header is rejected before it reaches a handler.

use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::headers::authorization::Basic;
use axum::headers::Authorization;
use axum::TypedHeader;

use crate::error::AppError;

/// Extractor that gates a route behind the presence of Basic credentials.
/// Applied via `axum::extract::extractor_middleware::<AuthenticatedUser>()`
/// so routes never see the extracted value themselves -- it exists purely
/// to run `from_request` and reject unauthenticated requests.
pub struct AuthenticatedUser {
    pub username: String,
}

#[async_trait]
impl<B> FromRequest<B> for AuthenticatedUser
where
    B: Send,
{
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(basic)) =
            TypedHeader::<Authorization<Basic>>::from_request(req)
                .await
                .map_err(|_| AppError::Unauthenticated)?;

        Ok(AuthenticatedUser {
            username: basic.username().to_owned(),
        })
    }
}
