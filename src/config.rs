//! Controller settings. The defaults are the values the Yeelight Blue II firmware was built
//! against; change them only for testing or for a compatible bulb with a different name.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_cr as serde;
use std::time::Duration;
use uuid::Uuid;

use crate::api::ScanFilter;
use crate::constants::{DEVICE_NAME, SERVICE_UUID, SETTLE_DELAY, WARNING_DELAY};

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_cr", default)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Advertised local name a peripheral must carry, compared exactly.
    pub local_name: String,
    /// Wait between discovering a bulb and connecting to it.
    pub settle_delay: Duration,
    /// Delay before reporting an adapter that was not ready at startup.
    pub warning_delay: Duration,
    pub allow_duplicates: bool,
    /// Services scanned for in addition to the vendor service.
    pub extra_services: Vec<Uuid>,
    /// Extra attempts for connect and discovery. Zero keeps the single best-effort attempt.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            local_name: DEVICE_NAME.to_owned(),
            settle_delay: SETTLE_DELAY,
            warning_delay: WARNING_DELAY,
            allow_duplicates: false,
            extra_services: Vec::new(),
            retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl ControllerConfig {
    /// The filter handed to the transport when scanning starts.
    pub fn scan_filter(&self) -> ScanFilter {
        let mut services = vec![SERVICE_UUID];
        services.extend(
            self.extra_services
                .iter()
                .filter(|uuid| **uuid != SERVICE_UUID)
                .copied(),
        );
        ScanFilter {
            services,
            allow_duplicates: self.allow_duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::uuid_from_u16;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.local_name, "Yeelight Blue II");
        assert_eq!(config.settle_delay, Duration::from_millis(300));
        assert_eq!(config.warning_delay, Duration::from_millis(3000));
        assert_eq!(config.retries, 0);
    }

    #[test]
    fn scan_filter_always_leads_with_vendor_service() {
        let config = ControllerConfig {
            extra_services: vec![SERVICE_UUID, uuid_from_u16(0x180a)],
            allow_duplicates: true,
            ..Default::default()
        };
        let filter = config.scan_filter();
        assert_eq!(filter.services, vec![SERVICE_UUID, uuid_from_u16(0x180a)]);
        assert!(filter.allow_duplicates);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ControllerConfig = toml::from_str(
            r#"
            local_name = "Yeelight Blue III"
            retries = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.local_name, "Yeelight Blue III");
        assert_eq!(config.retries, 2);
        assert_eq!(config.settle_delay, SETTLE_DELAY);
    }
}
