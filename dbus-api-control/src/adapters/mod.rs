pub mod daemontools;
pub mod log_file;

pub use daemontools::DaemontoolsControl;
pub use log_file::LogFile;
