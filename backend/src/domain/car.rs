//! Car registration data model.
//!
//! A [`Car`] binds a normalised [`PlateNumber`] to exactly one
//! [`OwnerIdentity`]. The value is immutable; transitions return new values.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Validation errors returned by the car value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarValidationError {
    EmptyPlate,
    InvalidPlateFormat { plate: String },
    EmptyOwner,
    InvalidContact,
}

impl fmt::Display for CarValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPlate => write!(f, "car_id must not be empty"),
            Self::InvalidPlateFormat { plate } => {
                write!(f, "car_id {plate} is not a recognised licence plate")
            }
            Self::EmptyOwner => write!(f, "owner identity must not be empty"),
            Self::InvalidContact => {
                write!(f, "owner_phone_num must contain between 5 and 15 digits")
            }
        }
    }
}

impl std::error::Error for CarValidationError {}

/// Normalised licence plate, the primary key of the registry.
///
/// Normalisation strips all whitespace and the `·` separator used on printed
/// plates, then upper-cases ASCII letters. Chinese characters pass through.
///
/// # Examples
/// ```
/// use nomcar::domain::PlateNumber;
///
/// let plate = PlateNumber::parse(" 粤a·12345 ").expect("valid plate");
/// assert_eq!(plate.as_ref(), "粤A12345");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlateNumber(String);

static PLATE_RE: OnceLock<Regex> = OnceLock::new();

fn plate_regex() -> &'static Regex {
    PLATE_RE.get_or_init(|| {
        // Province abbreviation, issuing-authority letter, 4-6 serial
        // characters (5 for regular plates, 6 for new-energy plates), then an
        // optional usage suffix.
        let pattern = concat!(
            "^[京津沪渝冀豫云辽黑湘皖鲁新苏浙赣鄂桂甘晋蒙陕吉闽贵粤青藏川宁琼使领]",
            "[A-Z][A-Z0-9]{4,6}[挂学警港澳领使]?$",
        );
        Regex::new(pattern).unwrap_or_else(|error| panic!("plate regex failed to compile: {error}"))
    })
}

fn normalise_plate(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '·')
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

impl PlateNumber {
    /// Normalise and validate a plate submitted for registration.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, CarValidationError> {
        let plate = Self::normalise(raw)?;
        if !plate_regex().is_match(plate.as_ref()) {
            return Err(CarValidationError::InvalidPlateFormat { plate: plate.0 });
        }
        Ok(plate)
    }

    /// Normalise a plate used as a lookup key without checking its format.
    ///
    /// Lookups of unrecognised plates must report the car as missing rather
    /// than as malformed.
    pub fn normalise(raw: impl AsRef<str>) -> Result<Self, CarValidationError> {
        let normalised = normalise_plate(raw.as_ref());
        if normalised.is_empty() {
            return Err(CarValidationError::EmptyPlate);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for PlateNumber {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PlateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PlateNumber> for String {
    fn from(value: PlateNumber) -> Self {
        value.0
    }
}

impl TryFrom<String> for PlateNumber {
    type Error = CarValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalise(value)
    }
}

/// Opaque identity string supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerIdentity(String);

impl OwnerIdentity {
    /// Construct an identity, rejecting blank values.
    pub fn new(raw: impl Into<String>) -> Result<Self, CarValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CarValidationError::EmptyOwner);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for OwnerIdentity {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<OwnerIdentity> for String {
    fn from(value: OwnerIdentity) -> Self {
        value.0
    }
}

impl TryFrom<String> for OwnerIdentity {
    type Error = CarValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Phone number used as the SMS delivery key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerContact(String);

const CONTACT_MIN_DIGITS: usize = 5;
const CONTACT_MAX_DIGITS: usize = 15;

impl OwnerContact {
    /// Validate a phone number made only of ASCII digits.
    pub fn new(raw: impl Into<String>) -> Result<Self, CarValidationError> {
        let raw = raw.into();
        let digits = raw.trim();
        let length = digits.len();
        if !(CONTACT_MIN_DIGITS..=CONTACT_MAX_DIGITS).contains(&length)
            || !digits.bytes().all(|byte| byte.is_ascii_digit())
        {
            return Err(CarValidationError::InvalidContact);
        }
        Ok(Self(digits.to_owned()))
    }

    /// Interpret the numeric wire form, where zero means "not supplied".
    ///
    /// # Examples
    /// ```
    /// use nomcar::domain::OwnerContact;
    ///
    /// assert!(OwnerContact::from_number(0).expect("zero is absent").is_none());
    /// let contact = OwnerContact::from_number(13_800_000_000).expect("valid");
    /// assert_eq!(contact.map(String::from).as_deref(), Some("13800000000"));
    /// ```
    pub fn from_number(number: i64) -> Result<Option<Self>, CarValidationError> {
        match number {
            0 => Ok(None),
            n if n < 0 => Err(CarValidationError::InvalidContact),
            n => Self::new(n.to_string()).map(Some),
        }
    }
}

impl AsRef<str> for OwnerContact {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<OwnerContact> for String {
    fn from(value: OwnerContact) -> Self {
        value.0
    }
}

impl TryFrom<String> for OwnerContact {
    type Error = CarValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Registered car bound to its owner.
///
/// ## Invariants
/// - `plate` is normalised.
/// - `owner` never changes for the lifetime of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    plate: PlateNumber,
    owner: OwnerIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact: Option<OwnerContact>,
}

impl Car {
    /// Create a fresh binding.
    pub fn register(
        plate: PlateNumber,
        owner: OwnerIdentity,
        contact: Option<OwnerContact>,
    ) -> Self {
        Self {
            plate,
            owner,
            contact,
        }
    }

    /// Return the binding with its contact replaced.
    #[must_use]
    pub fn update_contact(self, contact: Option<OwnerContact>) -> Self {
        Self { contact, ..self }
    }

    pub fn plate(&self) -> &PlateNumber {
        &self.plate
    }

    pub fn owner(&self) -> &OwnerIdentity {
        &self.owner
    }

    pub fn contact(&self) -> Option<&OwnerContact> {
        self.contact.as_ref()
    }

    /// Whether `owner` holds this binding.
    pub fn is_owned_by(&self, owner: &OwnerIdentity) -> bool {
        &self.owner == owner
    }
}

#[cfg(test)]
mod tests {
    //! Validation coverage for plates, identities, and contacts.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("粤A12345", "粤A12345")]
    #[case(" 粤a 12345 ", "粤A12345")]
    #[case("京B·D12345", "京BD12345")]
    #[case("沪C1234挂", "沪C1234挂")]
    #[case("粤A1234学", "粤A1234学")]
    fn parse_normalises_valid_plates(#[case] raw: &str, #[case] expected: &str) {
        let plate = PlateNumber::parse(raw).expect("valid plate");
        assert_eq!(plate.as_ref(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(" · ")]
    fn parse_rejects_empty_plates(#[case] raw: &str) {
        assert_eq!(PlateNumber::parse(raw), Err(CarValidationError::EmptyPlate));
    }

    #[rstest]
    #[case("UNKNOWN")]
    #[case("粤12345")]
    #[case("粤A12")]
    #[case("XA12345")]
    fn parse_rejects_unrecognised_formats(#[case] raw: &str) {
        assert!(matches!(
            PlateNumber::parse(raw),
            Err(CarValidationError::InvalidPlateFormat { .. })
        ));
    }

    #[rstest]
    fn normalise_accepts_any_non_empty_key() {
        let plate = PlateNumber::normalise("unknown").expect("non-empty");
        assert_eq!(plate.as_ref(), "UNKNOWN");
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    fn owner_identity_rejects_blank(#[case] raw: &str) {
        assert_eq!(OwnerIdentity::new(raw), Err(CarValidationError::EmptyOwner));
    }

    #[rstest]
    #[case(0, None)]
    #[case(13_800_000_000, Some("13800000000"))]
    #[case(12_345, Some("12345"))]
    fn contact_from_number(#[case] number: i64, #[case] expected: Option<&str>) {
        let contact = OwnerContact::from_number(number).expect("valid number");
        assert_eq!(contact.as_ref().map(AsRef::as_ref), expected);
    }

    #[rstest]
    #[case(-1)]
    #[case(1_234)]
    #[case(1_234_567_890_123_456)]
    fn contact_from_number_rejects_out_of_range(#[case] number: i64) {
        assert_eq!(
            OwnerContact::from_number(number),
            Err(CarValidationError::InvalidContact)
        );
    }

    #[rstest]
    fn update_contact_keeps_binding() {
        let car = Car::register(
            PlateNumber::parse("粤A12345").expect("plate"),
            OwnerIdentity::new("u1").expect("owner"),
            None,
        );
        let contact = OwnerContact::new("13800000000").expect("contact");
        let updated = car.clone().update_contact(Some(contact.clone()));

        assert_eq!(updated.plate(), car.plate());
        assert!(updated.is_owned_by(car.owner()));
        assert_eq!(updated.contact(), Some(&contact));
    }

    #[rstest]
    fn car_serde_round_trip_uses_plain_strings() {
        let car = Car::register(
            PlateNumber::parse("粤A12345").expect("plate"),
            OwnerIdentity::new("u1").expect("owner"),
            Some(OwnerContact::new("13800000000").expect("contact")),
        );
        let value = serde_json::to_value(&car).expect("serialise");
        assert_eq!(value["plate"], "粤A12345");
        assert_eq!(value["owner"], "u1");
        assert_eq!(value["contact"], "13800000000");
        let decoded: Car = serde_json::from_value(value).expect("deserialise");
        assert_eq!(decoded, car);
    }
}
