//! Public notify endpoint opened by whoever scans a car's code.
//!
//! ```text
//! GET /nomcar/api/notify/{code}?channel=sms
//! ```
//!
//! No identity is required. Success renders a small HTML page because the
//! caller is a phone browser rather than the mini-program.

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::IntoParams;

use crate::domain::ports::NotifyOwnerRequest;
use crate::domain::{Channel, DeliveryResult, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Query parameters for the notify endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotifyQuery {
    /// Delivery channel: `push` or `sms`.
    pub channel: Option<String>,
}

/// Ask the owner of the car behind `code` to move it.
#[utoipa::path(
    get,
    path = "/nomcar/api/notify/{code}",
    params(
        ("code" = String, Path, description = "Scannable code printed on the car"),
        NotifyQuery
    ),
    responses(
        (status = 200, description = "Owner notified", content_type = "text/html", body = String),
        (status = 400, description = "Missing channel, unsupported channel, or invalid code", body = Error),
        (status = 404, description = "Car no longer registered", body = Error),
        (status = 502, description = "Delivery failed after retries", body = Error)
    ),
    tags = ["notify"],
    operation_id = "notifyOwner",
    security([])
)]
#[get("/notify/{code}")]
pub async fn notify_owner(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<NotifyQuery>,
) -> ApiResult<HttpResponse> {
    let channel = query
        .into_inner()
        .channel
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| {
            Error::invalid_input("channel query parameter is required")
                .with_details(json!({ "field": "channel" }))
        })?;

    let result = state
        .notification
        .notify(NotifyOwnerRequest {
            code: path.into_inner(),
            channel: Some(channel),
        })
        .await?;
    info!(
        plate = %result.car_id,
        channel = %result.channel,
        attempts = result.attempts,
        "owner notified"
    );

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(success_page(&result)))
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1">
	<style>
	body { background-color: #f8f9fa; padding: 20px; text-align: center; }
	h1 { color: #343a40; }
	p { color: #6c757d; }
	</style>
	<title>「小🍐挪车」成功界面</title>
</head>
<body>
	<h1>成功！</h1>
	<p>「小🍐挪车」已为您{channel}通知车主挪车。</p>
</body>
</html>"#;

fn channel_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Push => "通过小程序消息",
        Channel::Sms => "通过短信",
    }
}

fn success_page(result: &DeliveryResult) -> String {
    SUCCESS_PAGE.replace("{channel}", channel_label(result.channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;

    use crate::domain::ports::{MockCarQuery, MockNotificationCommand, MockRegistrationCommand};
    use crate::domain::{DeliveryOutcome, PlateNumber};
    use crate::inbound::http::state::HttpState;
    use crate::test_support::notification::fixed_now;

    fn delivered(channel: Channel) -> DeliveryResult {
        DeliveryResult {
            car_id: PlateNumber::parse("粤A12345").expect("plate"),
            channel,
            outcome: DeliveryOutcome::Delivered,
            attempts: 1,
            provider_reference: Some("msg-1".to_owned()),
            completed_at: fixed_now(),
        }
    }

    async fn call(
        notification: MockNotificationCommand,
        uri: &str,
    ) -> actix_web::dev::ServiceResponse {
        let state = HttpState::new(
            Arc::new(MockRegistrationCommand::new()),
            Arc::new(notification),
            Arc::new(MockCarQuery::new()),
        );
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(web::scope("/nomcar/api").service(notify_owner)),
        )
        .await;
        actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await
    }

    #[rstest]
    #[case::push("push", Channel::Push, "通过小程序消息")]
    #[case::sms("sms", Channel::Sms, "通过短信")]
    #[actix_web::test]
    async fn success_renders_the_channel_used(
        #[case] requested: &'static str,
        #[case] channel: Channel,
        #[case] label: &str,
    ) {
        let mut notification = MockNotificationCommand::new();
        notification
            .expect_notify()
            .withf(move |request| {
                request.code == "v1.abc" && request.channel.as_deref() == Some(requested)
            })
            .times(1)
            .returning(move |_| Ok(delivered(channel)));

        let response = call(notification, &format!("/nomcar/api/notify/v1.abc?channel={requested}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .expect("content type")
            .to_owned();
        assert!(content_type.starts_with("text/html"));
        let body = actix_test::read_body(response).await;
        let page = std::str::from_utf8(&body).expect("utf8 page");
        assert!(page.contains(label));
    }

    #[rstest]
    #[case::absent("/nomcar/api/notify/v1.abc")]
    #[case::blank("/nomcar/api/notify/v1.abc?channel=%20")]
    #[actix_web::test]
    async fn missing_channel_is_invalid_input(#[case] uri: &str) {
        let mut notification = MockNotificationCommand::new();
        notification.expect_notify().never();

        let response = call(notification, uri).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = actix_test::read_body_json(response).await;
        assert_eq!(body["code"], "invalid_input");
        assert_eq!(body["details"]["field"], "channel");
    }

    #[rstest]
    #[actix_web::test]
    async fn delivery_failure_is_bad_gateway() {
        let mut notification = MockNotificationCommand::new();
        notification
            .expect_notify()
            .returning(|_| Err(Error::delivery_failed("sms delivery failed after 3 attempts")));

        let response = call(notification, "/nomcar/api/notify/v1.abc?channel=sms").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
