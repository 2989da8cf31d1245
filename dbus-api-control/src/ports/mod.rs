pub mod service_control;

pub use service_control::{ControlError, ServiceControl, SignalKind};
