//! Domain primitives, services, and ports.
//!
//! Purpose: hold the registration and notification rules independently of
//! HTTP and storage. Inbound adapters call the driving ports; outbound
//! adapters implement the driven ports.
//!
//! Public surface:
//! - Car, PlateNumber, OwnerIdentity, OwnerContact: the registry data model.
//! - CarRegistry: owner of car bindings with per-plate write serialisation.
//! - CodeResolver and CodeSecret: scannable code sealing and resolution.
//! - NotificationDispatcher: channel routing, retry, and deduplication.
//! - RegistrationService, NotificationService: driving port implementations.
//! - Error and ErrorCode: transport-agnostic failures.

pub mod car;
pub mod car_registry;
pub mod channel;
pub mod error;
pub mod keyed_lock;
pub mod notification;
pub mod notification_service;
pub mod ports;
pub mod registration_service;
pub mod scannable_code;
pub mod trace_id;

pub use self::car::{Car, CarValidationError, OwnerContact, OwnerIdentity, PlateNumber};
pub use self::car_registry::{CarRegistry, RegistrationOutcome};
pub use self::channel::{Channel, ChannelSet, UnknownChannel};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::keyed_lock::KeyedLocks;
pub use self::notification::{
    BackoffJitter, DeliveryGateways, DeliveryOutcome, DeliveryResult, DispatchState,
    DispatcherConfig, DispatcherRuntime, FailureClass, NotificationDispatcher, RandomJitter,
    RetrySleeper, TokioSleeper,
};
pub use self::notification_service::NotificationService;
pub use self::registration_service::RegistrationService;
pub use self::scannable_code::{CODE_SECRET_MIN_LEN, CodeResolver, CodeSecret, CodeSecretTooShort};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use nomcar::domain::{ApiResult, Error};
///
/// fn lookup() -> ApiResult<()> {
///     Err(Error::not_found("car 粤A12345 is not registered"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
