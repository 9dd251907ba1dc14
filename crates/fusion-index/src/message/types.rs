//! FusionEngine message type codes.

use std::fmt;

/// A FusionEngine message type code.
///
/// Codes outside the known set are carried through unchanged so that logs
/// written by newer devices can still be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MessageType(u16);

/// Known type codes and their display names.
const KNOWN_TYPES: &[(u16, &str)] = &[
    (0, "INVALID"),
    (10000, "POSE"),
    (10001, "GNSS_INFO"),
    (10002, "GNSS_SATELLITE"),
    (10003, "POSE_AUX"),
    (10004, "CALIBRATION_STATUS"),
    (10005, "RELATIVE_ENU_POSITION"),
    (11000, "IMU_MEASUREMENT"),
    (11101, "WHEEL_SPEED_MEASUREMENT"),
    (11102, "VEHICLE_SPEED_MEASUREMENT"),
    (11103, "WHEEL_TICK_MEASUREMENT"),
    (11104, "VEHICLE_TICK_MEASUREMENT"),
    (12000, "ROS_POSE"),
    (12010, "ROS_GPS_FIX"),
    (12011, "ROS_IMU"),
    (13000, "COMMAND_RESPONSE"),
    (13001, "MESSAGE_REQUEST"),
    (13002, "RESET_REQUEST"),
    (13003, "VERSION_INFO"),
    (13004, "EVENT_NOTIFICATION"),
    (13005, "SHUTDOWN_REQUEST"),
    (13006, "FAULT_CONTROL"),
    (13100, "SET_CONFIG"),
    (13101, "GET_CONFIG"),
    (13102, "SAVE_CONFIG"),
    (13103, "CONFIG_RESPONSE"),
    (13110, "IMPORT_DATA"),
    (13111, "EXPORT_DATA"),
    (13112, "PLATFORM_STORAGE_DATA"),
    (13220, "SET_MESSAGE_RATE"),
    (13221, "GET_MESSAGE_RATE"),
    (13222, "MESSAGE_RATE_RESPONSE"),
    (20000, "RESERVED"),
];

impl MessageType {
    /// Invalid type. Also marks the EOF record of an index file.
    pub const INVALID: Self = Self(0);
    /// Platform pose solution.
    pub const POSE: Self = Self(10000);
    /// GNSS constellation information.
    pub const GNSS_INFO: Self = Self(10001);
    /// Per-satellite GNSS information.
    pub const GNSS_SATELLITE: Self = Self(10002);
    /// Auxiliary pose information.
    pub const POSE_AUX: Self = Self(10003);
    /// Sensor calibration status.
    pub const CALIBRATION_STATUS: Self = Self(10004);
    /// Position relative to a base station in ENU frame.
    pub const RELATIVE_ENU_POSITION: Self = Self(10005);
    /// IMU measurement.
    pub const IMU_MEASUREMENT: Self = Self(11000);
    /// Wheel speed measurement.
    pub const WHEEL_SPEED_MEASUREMENT: Self = Self(11101);
    /// Vehicle speed measurement.
    pub const VEHICLE_SPEED_MEASUREMENT: Self = Self(11102);
    /// Wheel tick measurement.
    pub const WHEEL_TICK_MEASUREMENT: Self = Self(11103);
    /// Vehicle tick measurement.
    pub const VEHICLE_TICK_MEASUREMENT: Self = Self(11104);
    /// Response to a command.
    pub const COMMAND_RESPONSE: Self = Self(13000);
    /// Software/hardware version report.
    pub const VERSION_INFO: Self = Self(13003);
    /// Asynchronous event notification. Carries no P1 time.
    pub const EVENT_NOTIFICATION: Self = Self(13004);
    /// First code of the reserved range.
    pub const RESERVED: Self = Self(20000);

    /// Creates a message type from its raw code.
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the raw type code.
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Returns the display name of a known type, or `None` for unknown codes.
    pub fn name(self) -> Option<&'static str> {
        KNOWN_TYPES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }

    /// Returns true if the code belongs to the known set.
    pub fn is_known(self) -> bool {
        self.name().is_some()
    }

    /// Returns a human-readable description, e.g. `POSE (10000)`.
    pub fn type_string(self) -> String {
        match self.name() {
            Some(name) => format!("{} ({})", name, self.0),
            None if self.0 >= Self::RESERVED.0 => format!("RESERVED ({})", self.0),
            None => format!("UNKNOWN ({})", self.0),
        }
    }
}

impl From<u16> for MessageType {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<MessageType> for u16 {
    fn from(ty: MessageType) -> Self {
        ty.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_string() {
        assert_eq!(MessageType::POSE.type_string(), "POSE (10000)");
        assert_eq!(MessageType::new(20005).type_string(), "RESERVED (20005)");
        assert_eq!(MessageType::new(42).type_string(), "UNKNOWN (42)");
    }

    #[test]
    fn test_known_codes() {
        assert!(MessageType::EVENT_NOTIFICATION.is_known());
        assert!(!MessageType::new(9999).is_known());
        assert_eq!(u16::from(MessageType::INVALID), 0);
    }
}
