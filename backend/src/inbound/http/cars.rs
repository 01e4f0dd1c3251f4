//! Owner-facing car endpoints.
//!
//! ```text
//! POST /nomcar/api/register {"car_id":"粤A12345","owner_phone_num":13800000000}
//! GET /nomcar/api/cars
//! GET /nomcar/api/qrcode/{car}
//! ```
//!
//! All three require the `x-wx-openid` header.

use actix_web::{HttpRequest, HttpResponse, error::JsonPayloadError, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::{IssuedCode, RegisterCarRequest};
use crate::domain::{Car, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::Owner;
use crate::inbound::http::response::Envelope;
use crate::inbound::http::state::HttpState;

/// Registration body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RegisterCarBody {
    #[schema(example = "粤A12345")]
    pub car_id: String,
    /// Zero or absent means no phone number.
    #[serde(default)]
    #[schema(example = 13800000000_i64)]
    pub owner_phone_num: Option<i64>,
}

/// Car as shown to its owner.
#[derive(Debug, Serialize, ToSchema)]
pub struct CarView {
    pub car_id: String,
    /// Zero when no phone number is on file.
    pub owner_phone_num: i64,
}

impl From<&Car> for CarView {
    fn from(car: &Car) -> Self {
        let owner_phone_num = car
            .contact()
            .and_then(|contact| contact.as_ref().parse().ok())
            .unwrap_or(0);
        Self {
            car_id: car.plate().to_string(),
            owner_phone_num,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarList {
    pub cars: Vec<CarView>,
}

/// JSON extractor configuration turning body errors into domain errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error)
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    Error::invalid_input(format!("request body is not valid: {err}"))
        .with_details(json!({ "field": "body" }))
        .into()
}

/// Register a car, or refresh its phone number, for the calling owner.
#[utoipa::path(
    post,
    path = "/nomcar/api/register",
    request_body = RegisterCarBody,
    responses(
        (status = 200, description = "Registered; body is `{code: 0, message: \"success\"}`"),
        (status = 400, description = "Invalid plate or phone number", body = Error),
        (status = 401, description = "Missing identity", body = Error),
        (status = 409, description = "Plate registered to another owner", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["cars"],
    operation_id = "registerCar"
)]
#[post("/register")]
pub async fn register_car(
    state: web::Data<HttpState>,
    owner: Owner,
    payload: web::Json<RegisterCarBody>,
) -> ApiResult<HttpResponse> {
    let RegisterCarBody {
        car_id,
        owner_phone_num,
    } = payload.into_inner();
    state
        .registration
        .register(RegisterCarRequest {
            owner: owner.into_inner(),
            car_id,
            owner_phone_num,
        })
        .await?;
    Ok(Envelope::empty().into_response())
}

/// List the caller's cars.
#[utoipa::path(
    get,
    path = "/nomcar/api/cars",
    responses(
        (status = 200, description = "Cars owned by the caller", body = Envelope<CarList>),
        (status = 401, description = "Missing identity", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["cars"],
    operation_id = "listCars"
)]
#[get("/cars")]
pub async fn list_cars(state: web::Data<HttpState>, owner: Owner) -> ApiResult<HttpResponse> {
    let owner = owner.into_inner();
    let cars = state.cars.list_cars(&owner).await?;
    info!(owner = %owner, count = cars.len(), "listed cars");
    Ok(Envelope::with_data(CarList {
        cars: cars.iter().map(CarView::from).collect(),
    })
    .into_response())
}

/// Issue the scannable code for one of the caller's cars.
#[utoipa::path(
    get,
    path = "/nomcar/api/qrcode/{car}",
    params(("car" = String, Path, description = "Plate number")),
    responses(
        (status = 200, description = "Code and notify link", body = Envelope<IssuedCode>),
        (status = 401, description = "Missing identity", body = Error),
        (status = 404, description = "Car not registered to the caller", body = Error)
    ),
    tags = ["cars"],
    operation_id = "issueCode"
)]
#[get("/qrcode/{car}")]
pub async fn issue_code(
    state: web::Data<HttpState>,
    owner: Owner,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let car_id = path.into_inner();
    let issued = state.cars.issue_code(&owner.into_inner(), &car_id).await?;
    Ok(Envelope::with_data(issued).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::Value;

    use crate::domain::ports::{
        MockCarQuery, MockNotificationCommand, MockRegistrationCommand,
    };
    use crate::domain::{OwnerContact, OwnerIdentity, PlateNumber};
    use crate::inbound::http::identity::OWNER_ID_HEADER;

    fn state(registration: MockRegistrationCommand, cars: MockCarQuery) -> HttpState {
        HttpState::new(
            Arc::new(registration),
            Arc::new(MockNotificationCommand::new()),
            Arc::new(cars),
        )
    }

    async fn call(state: HttpState, request: actix_test::TestRequest) -> (StatusCode, Value) {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(json_config())
                .service(
                    web::scope("/nomcar/api")
                        .service(register_car)
                        .service(list_cars)
                        .service(issue_code),
                ),
        )
        .await;
        let response = actix_test::call_service(&app, request.to_request()).await;
        let status = response.status();
        let body = actix_test::read_body(response).await;
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[rstest]
    #[actix_web::test]
    async fn register_forwards_body_and_identity() {
        let mut registration = MockRegistrationCommand::new();
        registration
            .expect_register()
            .withf(|request| {
                request.owner.as_ref() == "u1"
                    && request.car_id == "粤A12345"
                    && request.owner_phone_num == Some(13_800_000_000)
            })
            .times(1)
            .returning(|_| Ok(()));

        let (status, body) = call(
            state(registration, MockCarQuery::new()),
            actix_test::TestRequest::post()
                .uri("/nomcar/api/register")
                .insert_header((OWNER_ID_HEADER, "u1"))
                .set_json(json!({"car_id": "粤A12345", "owner_phone_num": 13_800_000_000_i64})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"code": 0, "message": "success"}));
    }

    #[rstest]
    #[actix_web::test]
    async fn register_without_identity_is_unauthorised() {
        let mut registration = MockRegistrationCommand::new();
        registration.expect_register().never();

        let (status, body) = call(
            state(registration, MockCarQuery::new()),
            actix_test::TestRequest::post()
                .uri("/nomcar/api/register")
                .set_json(json!({"car_id": "粤A12345"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "missing_identity");
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_body_is_invalid_input() {
        let mut registration = MockRegistrationCommand::new();
        registration.expect_register().never();

        let (status, body) = call(
            state(registration, MockCarQuery::new()),
            actix_test::TestRequest::post()
                .uri("/nomcar/api/register")
                .insert_header((OWNER_ID_HEADER, "u1"))
                .set_json(json!({"owner_phone_num": "not a number"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[rstest]
    #[actix_web::test]
    async fn conflicts_surface_as_409() {
        let mut registration = MockRegistrationCommand::new();
        registration.expect_register().returning(|_| {
            Err(Error::ownership_conflict("car 粤A12345 is registered to another owner")
                .with_details(json!({"carId": "粤A12345"})))
        });

        let (status, body) = call(
            state(registration, MockCarQuery::new()),
            actix_test::TestRequest::post()
                .uri("/nomcar/api/register")
                .insert_header((OWNER_ID_HEADER, "u2"))
                .set_json(json!({"car_id": "粤A12345"})),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["details"]["carId"], "粤A12345");
    }

    #[rstest]
    #[actix_web::test]
    async fn list_renders_plates_and_phone_numbers() {
        let mut cars = MockCarQuery::new();
        cars.expect_list_cars()
            .withf(|owner| owner.as_ref() == "u1")
            .returning(|owner| {
                let with_phone = Car::register(
                    PlateNumber::parse("粤A12345").expect("plate"),
                    owner.clone(),
                    Some(OwnerContact::new("13800000000").expect("contact")),
                );
                let without_phone = Car::register(
                    PlateNumber::parse("京B54321").expect("plate"),
                    owner.clone(),
                    None,
                );
                Ok(vec![with_phone, without_phone])
            });

        let (status, body) = call(
            state(MockRegistrationCommand::new(), cars),
            actix_test::TestRequest::get()
                .uri("/nomcar/api/cars")
                .insert_header((OWNER_ID_HEADER, "u1")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["cars"],
            json!([
                {"car_id": "粤A12345", "owner_phone_num": 13_800_000_000_i64},
                {"car_id": "京B54321", "owner_phone_num": 0}
            ])
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn qrcode_returns_code_and_link() {
        let mut cars = MockCarQuery::new();
        cars.expect_issue_code()
            .withf(|owner, car_id| {
                owner == &OwnerIdentity::new("u1").expect("owner") && car_id == "粤A12345"
            })
            .returning(|_, _| {
                Ok(IssuedCode {
                    qr_code: "v1.abc".to_owned(),
                    notify_url: "https://nomcar.example.com/nomcar/api/notify/v1.abc".to_owned(),
                })
            });

        let (status, body) = call(
            state(MockRegistrationCommand::new(), cars),
            actix_test::TestRequest::get()
                .uri("/nomcar/api/qrcode/%E7%B2%A4A12345")
                .insert_header((OWNER_ID_HEADER, "u1")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["qr_code"], "v1.abc");
        assert_eq!(
            body["data"]["notify_url"],
            "https://nomcar.example.com/nomcar/api/notify/v1.abc"
        );
    }
}
