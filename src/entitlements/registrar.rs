use crate::models::Device;

/// Result of registering a device against an account's quota. Counts are
/// read inside the registration transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Fingerprint already holds a slot; nothing changed.
    AlreadyRegistered {
        device: Device,
        devices_used: i64,
        max_devices: i64,
    },
    /// Quota used up; nothing changed.
    LimitReached { current: i64, max: i64 },
    Registered {
        device: Device,
        devices_used: i64,
        max_devices: i64,
    },
}

/// What the registrar should do with a fingerprint, given the account's
/// current devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationDecision {
    AlreadyRegistered(Device),
    LimitReached { current: i64, max: i64 },
    Insert,
}

/// Decide against a fresh read of the device list. Callers must hold the
/// account's write lock between this read and the insert.
pub fn decide_registration(
    devices: &[Device],
    max_devices: i64,
    fingerprint: &str,
) -> RegistrationDecision {
    if let Some(device) = devices.iter().find(|d| d.fingerprint == fingerprint) {
        return RegistrationDecision::AlreadyRegistered(device.clone());
    }

    let current = devices.len() as i64;
    if current >= max_devices {
        return RegistrationDecision::LimitReached {
            current,
            max: max_devices,
        };
    }

    RegistrationDecision::Insert
}

/// Name used when the client does not supply one: "Device N" for the Nth slot.
pub fn default_device_name(proposed: Option<&str>, existing: usize) -> String {
    match proposed.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!("Device {}", existing + 1),
    }
}
