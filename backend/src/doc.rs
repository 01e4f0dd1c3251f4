//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects the HTTP endpoints, the error schema, and the
//! `x-wx-openid` identity scheme. Swagger UI serves it in debug builds and
//! the `openapi-dump` binary prints it for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::IssuedCode;
use crate::domain::{Channel, DeliveryOutcome, DeliveryResult, Error, ErrorCode};
use crate::inbound::http::cars::{CarList, CarView, RegisterCarBody};

/// Register the owner identity header as a security scheme.
struct OwnerIdentityAddon;

impl Modify for OwnerIdentityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "OwnerOpenId",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-wx-openid",
                "Owner identity forwarded by the mini-program gateway.",
            ))),
        );
    }
}

/// OpenAPI document for the nomcar API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&OwnerIdentityAddon),
    info(
        title = "nomcar API",
        description = "Car registration and \"please move your car\" notifications."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("OwnerOpenId" = [])),
    paths(
        crate::inbound::http::cars::register_car,
        crate::inbound::http::cars::list_cars,
        crate::inbound::http::cars::issue_code,
        crate::inbound::http::notify::notify_owner,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        RegisterCarBody,
        CarView,
        CarList,
        IssuedCode,
        DeliveryResult,
        DeliveryOutcome,
        Channel
    )),
    tags(
        (name = "cars", description = "Owner-facing registration and codes"),
        (name = "notify", description = "Public notification trigger"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated document.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    #[case("Error", "code")]
    #[case("Error", "message")]
    #[case("RegisterCarBody", "car_id")]
    #[case("RegisterCarBody", "owner_phone_num")]
    #[case("IssuedCode", "notify_url")]
    fn schemas_expose_wire_fields(#[case] schema: &str, #[case] field: &str) {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let found = schemas.get(schema).expect("schema registered");

        assert_object_schema_has_field(found, field);
    }

    #[rstest]
    #[case("/nomcar/api/register")]
    #[case("/nomcar/api/cars")]
    #[case("/nomcar/api/qrcode/{car}")]
    #[case("/nomcar/api/notify/{code}")]
    #[case("/health/ready")]
    fn every_endpoint_is_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    fn identity_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("OwnerOpenId"));
    }
}
