//! Caller identity taken from the `x-wx-openid` header.
//!
//! The mini-program gateway in front of the service authenticates the user
//! and forwards their open id. Requests without it are rejected before any
//! handler logic runs.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};

use crate::domain::{Error, OwnerIdentity};

/// Header carrying the authenticated owner identity.
pub const OWNER_ID_HEADER: &str = "x-wx-openid";

/// Extractor yielding the caller's [`OwnerIdentity`].
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerIdentity);

impl Owner {
    pub fn into_inner(self) -> OwnerIdentity {
        self.0
    }
}

impl FromRequest for Owner {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(owner_from_request(req).map(Owner))
    }
}

fn owner_from_request(req: &HttpRequest) -> Result<OwnerIdentity, Error> {
    let value = req
        .headers()
        .get(OWNER_ID_HEADER)
        .ok_or_else(|| Error::missing_identity(format!("{OWNER_ID_HEADER} header is required")))?;
    let raw = value.to_str().map_err(|_| {
        Error::missing_identity(format!("{OWNER_ID_HEADER} header must be visible ASCII"))
    })?;
    OwnerIdentity::new(raw)
        .map_err(|_| Error::missing_identity(format!("{OWNER_ID_HEADER} header must not be blank")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    use crate::domain::ErrorCode;

    #[rstest]
    fn reads_trimmed_identity() {
        let req = TestRequest::default()
            .insert_header((OWNER_ID_HEADER, "  o6_bmjrPTlm6_2sgVt7hMZOPfL2M "))
            .to_http_request();

        let owner = owner_from_request(&req).expect("identity present");

        assert_eq!(owner.as_ref(), "o6_bmjrPTlm6_2sgVt7hMZOPfL2M");
    }

    #[rstest]
    #[case::absent(None)]
    #[case::blank(Some("   "))]
    fn missing_or_blank_identity_is_rejected(#[case] header: Option<&str>) {
        let mut builder = TestRequest::default();
        if let Some(value) = header {
            builder = builder.insert_header((OWNER_ID_HEADER, value));
        }

        let err = owner_from_request(&builder.to_http_request()).expect_err("rejected");

        assert_eq!(err.code(), ErrorCode::MissingIdentity);
    }
}
