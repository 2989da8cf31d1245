use serde::Serialize;
use std::collections::BTreeMap;

/// Why the gate is closed (or that it is open).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateReason {
    UnsupportedImage,
    SubsystemDisabled,
    SubsystemNotRunning,
    SwitchNotFound,
    SwitchOff,
    SwitchOn,
    /// A bus read needed by the evaluation failed; carries the upstream text.
    Upstream(String),
}

impl GateReason {
    pub fn message(&self) -> String {
        match self {
            GateReason::UnsupportedImage => "unsupported image variant".to_string(),
            GateReason::SubsystemDisabled => "subsystem disabled".to_string(),
            GateReason::SubsystemNotRunning => "subsystem not yet running".to_string(),
            GateReason::SwitchNotFound => "switch not found".to_string(),
            GateReason::SwitchOff => "switch off".to_string(),
            GateReason::SwitchOn => "switch on".to_string(),
            GateReason::Upstream(message) => message.clone(),
        }
    }

    /// Key into [`remediation_hints`] for causes the operator can fix.
    pub fn hint_key(&self) -> Option<&'static str> {
        match self {
            GateReason::UnsupportedImage => Some("unsupported_image_variant"),
            GateReason::SubsystemDisabled => Some("subsystem_disabled"),
            GateReason::SubsystemNotRunning => Some("subsystem_not_running"),
            GateReason::SwitchNotFound => Some("switch_not_found"),
            GateReason::SwitchOff => Some("switch_off"),
            GateReason::SwitchOn | GateReason::Upstream(_) => None,
        }
    }
}

/// Partial findings gathered while the gate is evaluated. Fields stay `None`
/// when evaluation stopped before reaching them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GateDetails {
    pub image_variant: Option<String>,
    pub service_enabled: Option<i64>,
    pub service_running: Option<bool>,
    pub switch_found: bool,
    pub switch_service: Option<String>,
    pub switch_state: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteGateDecision {
    pub enabled: bool,
    pub reason: String,
    pub details: GateDetails,
    #[serde(skip)]
    pub cause: GateReason,
}

impl WriteGateDecision {
    pub fn open(details: GateDetails) -> Self {
        Self::from_reason(true, GateReason::SwitchOn, details)
    }

    pub fn closed(cause: GateReason, details: GateDetails) -> Self {
        Self::from_reason(false, cause, details)
    }

    fn from_reason(enabled: bool, cause: GateReason, details: GateDetails) -> Self {
        Self {
            enabled,
            reason: cause.message(),
            details,
            cause,
        }
    }
}

/// One hint per root cause, returned with every denial so a caller can fix
/// the setup without another round trip.
pub fn remediation_hints(switch_name: &str) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (
            "unsupported_image_variant",
            "Install the Venus OS large image; virtual switches are hosted by Node-RED, which \
             only ships with it."
                .to_string(),
        ),
        (
            "subsystem_disabled",
            "Enable Node-RED under Settings > Integrations > Venus OS Large features."
                .to_string(),
        ),
        (
            "subsystem_not_running",
            "Node-RED is enabled but has not registered any virtual switch yet; wait for it \
             to finish starting or deploy the flow that creates the switch."
                .to_string(),
        ),
        (
            "switch_not_found",
            format!("Create a virtual switch named '{switch_name}' in Node-RED and deploy it."),
        ),
        (
            "switch_off",
            format!("Turn the '{switch_name}' switch on from the GX device or VRM."),
        ),
    ])
}
