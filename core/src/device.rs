//! Device metadata capability.
//!
//! The platform layer knows the app bundle, OS and hardware; the core only
//! consumes the resulting record. Providers are called once per submission.

use crate::types::DeviceMetadata;

pub trait DeviceMetadataProvider: Send + Sync {
    fn collect(&self) -> DeviceMetadata;
}

/// A fixed record supplied by the host at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceMetadata(pub DeviceMetadata);

impl DeviceMetadataProvider for StaticDeviceMetadata {
    fn collect(&self) -> DeviceMetadata {
        self.0.clone()
    }
}

/// Attaches no metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeviceMetadata;

impl DeviceMetadataProvider for NoDeviceMetadata {
    fn collect(&self) -> DeviceMetadata {
        DeviceMetadata::default()
    }
}

/// Best-effort metadata from the running process, for hosts without a
/// platform layer (desktop tools, tests).
#[derive(Debug, Clone, Default)]
pub struct HostDeviceMetadata {
    pub app_name: Option<String>,
    pub app_version: Option<String>,
}

impl HostDeviceMetadata {
    pub fn new(app_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            app_name: Some(app_name.into()),
            app_version: Some(app_version.into()),
        }
    }
}

impl DeviceMetadataProvider for HostDeviceMetadata {
    fn collect(&self) -> DeviceMetadata {
        DeviceMetadata {
            app_name: self.app_name.clone(),
            app_version: self.app_version.clone(),
            build_number: None,
            os_name: Some(std::env::consts::OS.to_string()),
            os_version: None,
            device_model: Some(std::env::consts::ARCH.to_string()),
            locale: env_non_empty("LC_ALL").or_else(|| env_non_empty("LANG")),
            timezone: env_non_empty("TZ"),
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
