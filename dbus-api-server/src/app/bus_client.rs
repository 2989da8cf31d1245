use crate::domain::{BusAddress, BusValue};
use crate::ports::bus::{BusPort, BusResult};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Well-known name prefix shared by every Victron service.
pub const VENDOR_NAMESPACE: &str = "com.victronenergy.";
/// The settings daemon, the only service answering `GetItems` on its root.
pub const SETTINGS_SERVICE: &str = "com.victronenergy.settings";

/// The gateway's view of the system bus. No caching: every call is a fresh
/// round trip on the underlying connection.
#[derive(Clone)]
pub struct BusClient {
    port: Arc<dyn BusPort>,
}

impl BusClient {
    pub fn new(port: Arc<dyn BusPort>) -> Self {
        Self { port }
    }

    pub async fn get_value(&self, address: &BusAddress) -> BusResult<BusValue> {
        self.port.get_value(address).await
    }

    pub async fn get_text(&self, address: &BusAddress) -> BusResult<String> {
        self.port.get_text(address).await
    }

    /// Status code from the item; non-zero means the service refused the
    /// value.
    pub async fn set_value(&self, address: &BusAddress, value: BusValue) -> BusResult<i32> {
        self.port.set_value(address, value).await
    }

    /// Vendor services currently registered, sorted and de-duplicated.
    pub async fn list_services(&self) -> BusResult<Vec<String>> {
        self.list_services_with_prefix(VENDOR_NAMESPACE).await
    }

    pub async fn list_services_with_prefix(&self, prefix: &str) -> BusResult<Vec<String>> {
        let names = self.port.list_names().await?;
        let services: BTreeSet<String> = names
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect();
        Ok(services.into_iter().collect())
    }

    /// Every setting in one `GetItems` call on the settings root.
    pub async fn get_all_settings(&self) -> BusResult<Vec<(String, BusValue)>> {
        self.port
            .get_items(&BusAddress::new(SETTINGS_SERVICE, "/"))
            .await
    }
}
