//! Notify write path and owner-facing reads.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::domain::car_registry::map_validation_error;
use crate::domain::ports::{
    CarQuery, IssuedCode, NotificationCommand, NotifyOwnerRequest,
};
use crate::domain::{
    Car, CarRegistry, Channel, CodeResolver, DeliveryResult, Error, NotificationDispatcher,
    OwnerIdentity, PlateNumber,
};

/// Path segment under which notify links are served.
pub const NOTIFY_PATH: &str = "nomcar/api/notify/";

pub struct NotificationService {
    registry: Arc<CarRegistry>,
    codes: Arc<CodeResolver>,
    dispatcher: Arc<NotificationDispatcher>,
    public_base_url: Url,
    default_channel: Channel,
}

impl NotificationService {
    pub fn new(
        registry: Arc<CarRegistry>,
        codes: Arc<CodeResolver>,
        dispatcher: Arc<NotificationDispatcher>,
        public_base_url: Url,
    ) -> Self {
        let default_channel = dispatcher
            .channels()
            .iter()
            .next()
            .unwrap_or(Channel::Push);
        Self {
            registry,
            codes,
            dispatcher,
            public_base_url,
            default_channel,
        }
    }

    fn notify_url(&self, code: &str) -> Result<String, Error> {
        self.public_base_url
            .join(NOTIFY_PATH)
            .and_then(|base| base.join(code))
            .map(String::from)
            .map_err(|err| Error::internal(format!("failed to build notify link: {err}")))
    }
}

#[async_trait]
impl NotificationCommand for NotificationService {
    async fn notify(&self, request: NotifyOwnerRequest) -> Result<DeliveryResult, Error> {
        let plate = self.codes.decode(&request.code).await?;
        let channel = request
            .channel
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.default_channel.as_str().to_owned());
        self.dispatcher.notify(plate.as_ref(), &channel).await
    }
}

#[async_trait]
impl CarQuery for NotificationService {
    async fn list_cars(&self, owner: &OwnerIdentity) -> Result<Vec<Car>, Error> {
        self.registry.list_by_owner(owner).await
    }

    async fn issue_code(&self, owner: &OwnerIdentity, car_id: &str) -> Result<IssuedCode, Error> {
        let plate = PlateNumber::normalise(car_id).map_err(map_validation_error)?;
        let car = self.registry.find(&plate).await?;
        // Strangers get the same answer as for a missing car.
        if !car.is_owned_by(owner) {
            return Err(Error::not_found(format!("car {plate} is not registered")));
        }
        let qr_code = self.codes.encode(car.plate())?;
        let notify_url = self.notify_url(&qr_code)?;
        Ok(IssuedCode {
            qr_code,
            notify_url,
        })
    }
}
