//! Presence vocabulary: vendor visibility and participant roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor visibility for a stall, toggled by the vendor's own connection.
///
/// A separate boolean overlay, not a room membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorStatus {
    Online,
    Offline,
}

impl VendorStatus {
    /// True when the status is `Online`.
    pub fn is_online(&self) -> bool {
        matches!(self, VendorStatus::Online)
    }

    /// Converts a stored boolean flag into a status.
    pub fn from_flag(online: bool) -> Self {
        if online {
            VendorStatus::Online
        } else {
            VendorStatus::Offline
        }
    }
}

impl fmt::Display for VendorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VendorStatus::Online => write!(f, "online"),
            VendorStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Role a connection declares when entering a stall room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Buyer,
    Vendor,
}
