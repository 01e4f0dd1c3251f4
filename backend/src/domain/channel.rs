//! Notification channels and the configured channel set.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Delivery mechanism used to reach an owner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Push notification addressed by owner identity.
    Push,
    /// Text message addressed by owner contact.
    Sms,
}

impl Channel {
    /// Every channel the domain knows how to deliver through.
    pub const ALL: [Channel; 2] = [Channel::Push, Channel::Sms];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel name that does not match any known channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("channel {name:?} is not supported")]
pub struct UnknownChannel {
    pub name: String,
}

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "sms" => Ok(Self::Sms),
            _ => Err(UnknownChannel { name: s.to_owned() }),
        }
    }
}

/// Channels enabled for this deployment.
///
/// # Examples
/// ```
/// use nomcar::domain::{Channel, ChannelSet};
///
/// let set: ChannelSet = "push, sms".parse().expect("known channels");
/// assert!(set.contains(Channel::Sms));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSet(BTreeSet<Channel>);

impl ChannelSet {
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self(channels.into_iter().collect())
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.0.contains(&channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new(Channel::ALL)
    }
}

impl FromStr for ChannelSet {
    type Err = UnknownChannel;

    /// Parse a comma separated list, ignoring blank entries.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Channel::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }
}
