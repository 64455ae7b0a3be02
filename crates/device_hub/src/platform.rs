//! Platform tags and connection identifiers

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::DeviceError;

/// Separator between the platform tag and the address in a [`ConnectionId`]
pub const ID_SEPARATOR: char = ':';

/// Backend kind behind a device connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Offline playback of recorded fixture files
    #[serde(rename = "AndroidMock")]
    Fixture,
    /// uiautomator2 automation bridge
    #[serde(rename = "Android")]
    UiAutomator,
    /// Raw ADB
    #[serde(rename = "AndroidADB")]
    Adb,
    /// WebDriverAgent automation bridge
    #[serde(rename = "iOS")]
    Ios,
}

/// Platform tag lookup
pub static PLATFORM_TAGS: phf::Map<&'static str, Platform> = phf_map! {
    "AndroidMock" => Platform::Fixture,
    "Android" => Platform::UiAutomator,
    "AndroidADB" => Platform::Adb,
    "iOS" => Platform::Ios,
};

impl Platform {
    /// All recognized platforms
    pub const ALL: [Platform; 4] = [
        Platform::Fixture,
        Platform::UiAutomator,
        Platform::Adb,
        Platform::Ios,
    ];

    /// Wire tag used in connection identifiers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixture => "AndroidMock",
            Self::UiAutomator => "Android",
            Self::Adb => "AndroidADB",
            Self::Ios => "iOS",
        }
    }
}

impl FromStr for Platform {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PLATFORM_TAGS
            .get(s)
            .copied()
            .ok_or_else(|| DeviceError::UnknownPlatform(s.to_string()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable registry key: `platform + ":" + address`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(platform: Platform, address: &str) -> Self {
        Self(format!("{}{}{}", platform.as_str(), ID_SEPARATOR, address))
    }

    /// Split an identifier on its first separator.
    ///
    /// The address half may contain further separators (URLs, `host:port`).
    pub fn parse(id: &str) -> Result<(Platform, String), DeviceError> {
        let (platform, address) = id
            .split_once(ID_SEPARATOR)
            .ok_or_else(|| DeviceError::MalformedIdentifier(id.to_string()))?;
        Ok((platform.parse()?, address.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConnectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ConnectionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
            assert!(!platform.as_str().contains(ID_SEPARATOR));
        }
    }

    #[test]
    fn test_unknown_platform() {
        let err = "Harmony".parse::<Platform>().unwrap_err();
        assert!(matches!(err, DeviceError::UnknownPlatform(p) if p == "Harmony"));
    }

    #[test]
    fn test_connection_id_splits_on_first_separator() {
        let id = ConnectionId::new(Platform::Ios, "http://localhost:8100");
        assert_eq!(id.as_str(), "iOS:http://localhost:8100");

        let (platform, address) = ConnectionId::parse(id.as_str()).unwrap();
        assert_eq!(platform, Platform::Ios);
        assert_eq!(address, "http://localhost:8100");
    }

    #[test]
    fn test_connection_id_empty_address() {
        let (platform, address) = ConnectionId::parse("AndroidADB:").unwrap();
        assert_eq!(platform, Platform::Adb);
        assert_eq!(address, "");
    }

    #[test]
    fn test_connection_id_without_separator() {
        let err = ConnectionId::parse("AndroidADB").unwrap_err();
        assert!(matches!(err, DeviceError::MalformedIdentifier(_)));
    }
}
