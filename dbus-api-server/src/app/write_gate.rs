//! Write permission check backed by a Node-RED virtual switch.
//!
//! The switch is owned by another process that can create, remove or restart
//! it at any time, so nothing here is cached: every evaluation walks the bus
//! again and stops at the first failing step.

use super::bus_client::{BusClient, SETTINGS_SERVICE};
use crate::domain::{BusAddress, BusValue, GateDetails, GateReason, WriteGateDecision};
use crate::ports::PlatformProbe;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_SWITCH_NAME: &str = "AI Write Enable";

#[derive(Debug, Clone)]
pub struct WriteGateConfig {
    /// Image flavour that ships the switch-hosting subsystem.
    pub required_variant: String,
    pub settings_service: String,
    /// Settings path holding the subsystem's enable flag (non-zero = on).
    pub subsystem_flag_path: String,
    /// Well-known name prefix of virtual switch services.
    pub switch_service_prefix: String,
    /// Name the approval switch carries, compared case-insensitively.
    pub switch_name: String,
    pub name_path: String,
    pub state_path: String,
    /// State value meaning "off"; anything else counts as on.
    pub off_value: i64,
}

impl Default for WriteGateConfig {
    fn default() -> Self {
        Self {
            required_variant: "large".to_string(),
            settings_service: SETTINGS_SERVICE.to_string(),
            subsystem_flag_path: "/Settings/Services/NodeRed".to_string(),
            switch_service_prefix: "com.victronenergy.switch.".to_string(),
            switch_name: DEFAULT_SWITCH_NAME.to_string(),
            name_path: "/CustomName".to_string(),
            state_path: "/SwitchableOutput/0/State".to_string(),
            off_value: 0,
        }
    }
}

pub struct WriteGate {
    config: WriteGateConfig,
    platform: Arc<dyn PlatformProbe>,
}

impl WriteGate {
    pub fn new(config: WriteGateConfig, platform: Arc<dyn PlatformProbe>) -> Self {
        Self { config, platform }
    }

    pub fn switch_name(&self) -> &str {
        &self.config.switch_name
    }

    pub async fn evaluate(&self, bus: &BusClient) -> WriteGateDecision {
        let mut details = GateDetails::default();

        details.image_variant = self.platform.image_variant().await;
        let supported = details
            .image_variant
            .as_deref()
            .is_some_and(|variant| variant.eq_ignore_ascii_case(&self.config.required_variant));
        if !supported {
            return WriteGateDecision::closed(GateReason::UnsupportedImage, details);
        }

        let flag_address =
            BusAddress::new(&self.config.settings_service, &self.config.subsystem_flag_path);
        let flag = match bus.get_value(&flag_address).await {
            Ok(value) => match value.as_i64() {
                Some(flag) => flag,
                None => {
                    let reason = format!("unexpected value for {flag_address}: {value:?}");
                    return WriteGateDecision::closed(GateReason::Upstream(reason), details);
                }
            },
            Err(err) => return WriteGateDecision::closed(GateReason::Upstream(err.to_string()), details),
        };
        details.service_enabled = Some(flag);
        if flag == 0 {
            return WriteGateDecision::closed(GateReason::SubsystemDisabled, details);
        }

        let switches = match bus
            .list_services_with_prefix(&self.config.switch_service_prefix)
            .await
        {
            Ok(switches) => switches,
            Err(err) => return WriteGateDecision::closed(GateReason::Upstream(err.to_string()), details),
        };
        details.service_running = Some(!switches.is_empty());
        if switches.is_empty() {
            return WriteGateDecision::closed(GateReason::SubsystemNotRunning, details);
        }

        let Some(service) = self.find_switch(bus, &switches).await else {
            return WriteGateDecision::closed(GateReason::SwitchNotFound, details);
        };
        details.switch_found = true;
        details.switch_service = Some(service.clone());

        let state_address = BusAddress::new(service, &self.config.state_path);
        match bus.get_value(&state_address).await {
            Ok(value) => {
                let state = value.as_i64();
                details.switch_state = state;
                if state == Some(self.config.off_value) {
                    WriteGateDecision::closed(GateReason::SwitchOff, details)
                } else {
                    WriteGateDecision::open(details)
                }
            }
            Err(err) => WriteGateDecision::closed(GateReason::Upstream(err.to_string()), details),
        }
    }

    async fn find_switch(&self, bus: &BusClient, switches: &[String]) -> Option<String> {
        for service in switches {
            let address = BusAddress::new(service.as_str(), &self.config.name_path);
            match bus.get_value(&address).await {
                Ok(BusValue::Str(name))
                    if name.trim().eq_ignore_ascii_case(&self.config.switch_name) =>
                {
                    return Some(service.clone());
                }
                Ok(_) => {}
                Err(err) => debug!(%service, %err, "skipping switch without readable name"),
            }
        }
        None
    }
}
