//! Channel-specific message construction.

use chrono::{DateTime, Utc};

use crate::domain::Channel;
use crate::domain::Car;
use crate::domain::ports::{DeliveryGatewayError, OutboundMessage};

/// Build the message for `channel`.
///
/// Push messages are addressed to the owner identity. SMS messages need the
/// owner's phone number; a car registered without one cannot be reached by
/// SMS, which is a permanent failure.
pub(super) fn build_message(
    car: &Car,
    channel: Channel,
    requested_at: DateTime<Utc>,
) -> Result<OutboundMessage, DeliveryGatewayError> {
    let recipient = match channel {
        Channel::Push => car.owner().as_ref().to_owned(),
        Channel::Sms => car
            .contact()
            .map(|contact| contact.as_ref().to_owned())
            .ok_or_else(|| {
                DeliveryGatewayError::invalid_recipient(format!(
                    "car {} has no contact phone number",
                    car.plate()
                ))
            })?,
    };

    Ok(OutboundMessage {
        channel,
        recipient,
        plate: car.plate().clone(),
        body: format!(
            "Someone is waiting for you to move your car {}. Please return to it as soon as you can.",
            car.plate()
        ),
        requested_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerContact, OwnerIdentity, PlateNumber};
    use chrono::TimeZone;
    use rstest::rstest;

    fn car(contact: Option<&str>) -> Car {
        Car::register(
            PlateNumber::parse("粤A12345").expect("plate"),
            OwnerIdentity::new("openid-1").expect("owner"),
            contact.map(|raw| OwnerContact::new(raw).expect("contact")),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
            .single()
            .expect("valid time")
    }

    #[rstest]
    #[case(Channel::Push, Some("13800000000"), "openid-1")]
    #[case(Channel::Push, None, "openid-1")]
    #[case(Channel::Sms, Some("13800000000"), "13800000000")]
    fn addresses_recipient_per_channel(
        #[case] channel: Channel,
        #[case] contact: Option<&str>,
        #[case] expected: &str,
    ) {
        let message = build_message(&car(contact), channel, now()).expect("message");
        assert_eq!(message.recipient, expected);
        assert_eq!(message.channel, channel);
        assert!(message.body.contains("粤A12345"));
    }

    #[rstest]
    fn sms_without_contact_is_permanent() {
        let err = build_message(&car(None), Channel::Sms, now()).expect_err("no contact");
        assert!(!err.is_retryable());
    }
}
