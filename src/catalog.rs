//! Device catalog: the fixed set of devices a screenshot can be framed in.

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Browser emulation parameters for one device
#[derive(Debug, Clone, PartialEq)]
pub struct Emulation {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
    pub is_landscape: bool,
}

/// A named device: its frame asset and how to emulate it
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub id: String,
    /// Frame asset path, relative to the asset root
    pub image_uri: PathBuf,
    pub emulation: Emulation,
}

/// Read-only index of device profiles, keyed by id.
///
/// Ids keep the order the profiles were defined in so listings are stable.
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    order: Vec<String>,
    by_id: HashMap<String, DeviceProfile>,
}

impl DeviceCatalog {
    /// Index a list of fully-formed profiles. Duplicate ids are rejected.
    pub fn new(profiles: Vec<DeviceProfile>) -> Result<Self> {
        let mut order = Vec::with_capacity(profiles.len());
        let mut by_id = HashMap::with_capacity(profiles.len());

        for profile in profiles {
            if by_id.contains_key(&profile.id) {
                return Err(Error::ConfigError(format!(
                    "duplicate device id '{}'",
                    profile.id
                )));
            }
            order.push(profile.id.clone());
            by_id.insert(profile.id.clone(), profile);
        }

        Ok(Self { order, by_id })
    }

    /// The catalog shipped with the service.
    pub fn builtin() -> Result<Self> {
        Self::new(builtin_profiles())
    }

    pub fn lookup(&self, id: &str) -> Option<&DeviceProfile> {
        self.by_id.get(id)
    }

    /// All device ids, in definition order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Profiles for the built-in devices. Emulation values follow the common
/// browser-automation device descriptors; the MacBook viewport is sized to
/// the screen cutout of its frame.
pub fn builtin_profiles() -> Vec<DeviceProfile> {
    vec![
        DeviceProfile {
            id: "apple-iPhone-11-pro-max".to_string(),
            image_uri: PathBuf::from("assets/Apple iPhone 11 Pro Max Space Grey.png"),
            emulation: Emulation {
                user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 13_7 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.1.2 Mobile/15E148 Safari/604.1".to_string(),
                viewport_width: 414,
                viewport_height: 896,
                device_scale_factor: 3.0,
                is_mobile: true,
                has_touch: true,
                is_landscape: false,
            },
        },
        DeviceProfile {
            id: "apple-iPad-pro-13-landscape".to_string(),
            image_uri: PathBuf::from("assets/Apple iPad Pro 13 Silver - Landscape.png"),
            emulation: Emulation {
                user_agent: "Mozilla/5.0 (iPad; CPU OS 11_0 like Mac OS X) AppleWebKit/604.1.34 (KHTML, like Gecko) Version/11.0 Mobile/15A5341f Safari/604.1".to_string(),
                viewport_width: 1366,
                viewport_height: 1024,
                device_scale_factor: 2.0,
                is_mobile: true,
                has_touch: true,
                is_landscape: true,
            },
        },
        DeviceProfile {
            id: "apple-macbook".to_string(),
            image_uri: PathBuf::from("assets/Apple-Macbook-Space-Grey.png"),
            emulation: Emulation {
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/11.1.2 Safari/605.1.15".to_string(),
                // 2.08 x 554 and 2.1 x 346, rounded
                viewport_width: 1152,
                viewport_height: 727,
                device_scale_factor: 2.0,
                is_mobile: false,
                has_touch: false,
                is_landscape: false,
            },
        },
    ]
}
