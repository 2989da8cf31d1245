use crate::domain::{BusAddress, BusValue};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("system bus unavailable: {0}")]
    Unavailable(String),
    #[error("no such object {address}: {message}")]
    NoSuchObject { address: String, message: String },
    #[error("bus call failed: {0}")]
    Call(String),
    #[error("unsupported bus value: {0}")]
    Unsupported(String),
}

pub type BusResult<T> = Result<T, BusError>;

/// Raw `com.victronenergy.BusItem` operations plus name listing, one round
/// trip per call.
#[async_trait]
pub trait BusPort: Send + Sync {
    async fn get_value(&self, address: &BusAddress) -> BusResult<BusValue>;

    async fn get_text(&self, address: &BusAddress) -> BusResult<String>;

    /// Returns the item's status code; `0` means the write was accepted.
    async fn set_value(&self, address: &BusAddress, value: BusValue) -> BusResult<i32>;

    async fn list_names(&self) -> BusResult<Vec<String>>;

    /// Bulk read of every item below `address`, keyed by object path. Each
    /// entry is the item dictionary (`Value`, `Text`) as published by the
    /// service.
    async fn get_items(&self, address: &BusAddress) -> BusResult<Vec<(String, BusValue)>>;
}

/// Opens a fresh bus connection. Called once per supervisor cycle.
#[async_trait]
pub trait BusConnector: Send + Sync {
    async fn connect(&self) -> BusResult<Arc<dyn BusPort>>;
}
