pub mod dbus;
pub mod memory;

pub use dbus::{ZbusBus, ZbusConnector};
pub use memory::{InMemoryBus, InMemoryConnector};
