//! Fully wired domain services over in-memory adapters.
//!
//! Integration suites share this so they exercise the same composition as the
//! server bootstrap, with a scripted gateway and a controllable clock.

use std::sync::Arc;

use nomcar::domain::ports::{CarQuery, NotificationCommand, RegistrationCommand};
use nomcar::domain::{
    CarRegistry, CodeResolver, CodeSecret, DeliveryGateways, DispatcherConfig, DispatcherRuntime,
    NotificationDispatcher, NotificationService, RegistrationService,
};
use nomcar::inbound::http::state::HttpState;
use nomcar::outbound::persistence::InMemoryCarRepository;
use nomcar::test_support::notification::{
    MutableClock, NoJitter, RecordingSleeper, ScriptedGateway, fixed_now,
};
use url::Url;

pub const PUBLIC_BASE_URL: &str = "https://nomcar.example.com/";

pub struct Services {
    pub registration: Arc<RegistrationService>,
    pub notifications: Arc<NotificationService>,
    pub codes: Arc<CodeResolver>,
    pub gateway: Arc<ScriptedGateway>,
    pub clock: Arc<MutableClock>,
    pub sleeper: Arc<RecordingSleeper>,
}

impl Services {
    pub fn new(gateway: ScriptedGateway, config: DispatcherConfig) -> Self {
        let registry = Arc::new(CarRegistry::new(Arc::new(InMemoryCarRepository::default())));
        let secret = CodeSecret::from_bytes(vec![0x5a; 32]).expect("secret");
        let codes = Arc::new(CodeResolver::new(&secret, Arc::clone(&registry)));
        let gateway = Arc::new(gateway);
        let clock = Arc::new(MutableClock::new(fixed_now()));
        let sleeper = Arc::new(RecordingSleeper::default());
        let dispatcher = Arc::new(NotificationDispatcher::with_runtime(
            Arc::clone(&registry),
            DeliveryGateways::uniform(gateway.clone()),
            clock.clone(),
            DispatcherRuntime {
                sleeper: sleeper.clone(),
                jitter: Arc::new(NoJitter),
            },
            config,
        ));
        let notifications = Arc::new(NotificationService::new(
            Arc::clone(&registry),
            Arc::clone(&codes),
            dispatcher,
            Url::parse(PUBLIC_BASE_URL).expect("base url"),
        ));

        Self {
            registration: Arc::new(RegistrationService::new(registry)),
            notifications,
            codes,
            gateway,
            clock,
            sleeper,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScriptedGateway::default(), DispatcherConfig::default())
    }

    pub fn registration(&self) -> Arc<dyn RegistrationCommand> {
        self.registration.clone()
    }

    pub fn notification(&self) -> Arc<dyn NotificationCommand> {
        self.notifications.clone()
    }

    pub fn cars(&self) -> Arc<dyn CarQuery> {
        self.notifications.clone()
    }

    pub fn http_state(&self) -> HttpState {
        HttpState::new(self.registration(), self.notification(), self.cars())
    }
}
