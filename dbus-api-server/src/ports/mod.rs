pub mod bus;
pub mod platform;

pub use bus::{BusConnector, BusError, BusPort, BusResult};
pub use platform::PlatformProbe;
