pub mod control;

pub use control::{ControlService, ControlTimings, UpgradeReport};
