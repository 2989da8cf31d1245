pub mod bus;
pub mod config_file;
pub mod platform;

pub use bus::{InMemoryBus, InMemoryConnector, ZbusBus, ZbusConnector};
pub use config_file::FileConfigStore;
pub use platform::ImageTypeFile;
