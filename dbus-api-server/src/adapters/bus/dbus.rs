use crate::domain::{BusAddress, BusValue};
use crate::ports::bus::{BusConnector, BusError, BusPort, BusResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use zbus::{Connection, Proxy};
use zvariant::{OwnedValue, Value};

const BUS_ITEM_INTERFACE: &str = "com.victronenergy.BusItem";
const DBUS_SERVICE: &str = "org.freedesktop.DBus";
const DBUS_PATH: &str = "/org/freedesktop/DBus";

const NO_SUCH_OBJECT_ERRORS: &[&str] = &[
    "org.freedesktop.DBus.Error.ServiceUnknown",
    "org.freedesktop.DBus.Error.NameHasNoOwner",
    "org.freedesktop.DBus.Error.UnknownObject",
    "org.freedesktop.DBus.Error.UnknownInterface",
    "org.freedesktop.DBus.Error.UnknownMethod",
];

type ItemMap = HashMap<String, HashMap<String, OwnedValue>>;

/// Bus port backed by a single zbus connection.
pub struct ZbusBus {
    connection: Connection,
}

impl ZbusBus {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    async fn item_proxy<'a>(&'a self, address: &'a BusAddress) -> BusResult<Proxy<'a>> {
        Proxy::new(
            &self.connection,
            address.service.as_str(),
            address.path.as_str(),
            BUS_ITEM_INTERFACE,
        )
        .await
        .map_err(|err| map_error(address, err))
    }
}

#[async_trait]
impl BusPort for ZbusBus {
    async fn get_value(&self, address: &BusAddress) -> BusResult<BusValue> {
        let proxy = self.item_proxy(address).await?;
        let value: OwnedValue = proxy
            .call("GetValue", &())
            .await
            .map_err(|err| map_error(address, err))?;
        from_zvalue(&value)
    }

    async fn get_text(&self, address: &BusAddress) -> BusResult<String> {
        let proxy = self.item_proxy(address).await?;
        proxy
            .call("GetText", &())
            .await
            .map_err(|err| map_error(address, err))
    }

    async fn set_value(&self, address: &BusAddress, value: BusValue) -> BusResult<i32> {
        let argument = to_zvalue(&value)?;
        let proxy = self.item_proxy(address).await?;
        proxy
            .call("SetValue", &(argument,))
            .await
            .map_err(|err| map_error(address, err))
    }

    async fn list_names(&self) -> BusResult<Vec<String>> {
        let address = BusAddress::new(DBUS_SERVICE, DBUS_PATH);
        let proxy = Proxy::new(&self.connection, DBUS_SERVICE, DBUS_PATH, DBUS_SERVICE)
            .await
            .map_err(|err| map_error(&address, err))?;
        proxy
            .call("ListNames", &())
            .await
            .map_err(|err| map_error(&address, err))
    }

    async fn get_items(&self, address: &BusAddress) -> BusResult<Vec<(String, BusValue)>> {
        let proxy = self.item_proxy(address).await?;
        let items: ItemMap = proxy
            .call("GetItems", &())
            .await
            .map_err(|err| map_error(address, err))?;

        let mut entries = Vec::with_capacity(items.len());
        for (path, fields) in items {
            let mut fields: Vec<_> = fields.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            let item = fields
                .iter()
                .map(|(name, value)| Ok((BusValue::str(name.as_str()), from_zvalue(value)?)))
                .collect::<BusResult<Vec<_>>>()?;
            entries.push((path, BusValue::Dict(item)));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(service = %address.service, items = entries.len(), "bulk item read");
        Ok(entries)
    }
}

/// Connects to the system bus, or to an explicit address when configured.
#[derive(Debug, Clone, Default)]
pub struct ZbusConnector {
    address: Option<String>,
}

impl ZbusConnector {
    pub fn new(address: Option<String>) -> Self {
        Self { address }
    }
}

#[async_trait]
impl BusConnector for ZbusConnector {
    async fn connect(&self) -> BusResult<Arc<dyn BusPort>> {
        let builder = match &self.address {
            Some(address) => zbus::ConnectionBuilder::address(address.as_str()),
            None => zbus::ConnectionBuilder::system(),
        }
        .map_err(|err| BusError::Unavailable(err.to_string()))?;
        let connection = builder
            .build()
            .await
            .map_err(|err| BusError::Unavailable(err.to_string()))?;
        info!(
            "bus" = self.address.as_deref().unwrap_or("system"),
            "msg" = "connected to D-Bus"
        );
        Ok(Arc::new(ZbusBus::new(connection)))
    }
}

fn map_error(address: &BusAddress, err: zbus::Error) -> BusError {
    match &err {
        zbus::Error::MethodError(name, detail, _) => {
            let message = detail.clone().unwrap_or_else(|| name.to_string());
            if NO_SUCH_OBJECT_ERRORS.contains(&name.as_str()) {
                BusError::NoSuchObject {
                    address: address.to_string(),
                    message,
                }
            } else {
                BusError::Call(format!("{name}: {message}"))
            }
        }
        zbus::Error::InputOutput(_) | zbus::Error::Address(_) | zbus::Error::Handshake(_) => {
            BusError::Unavailable(err.to_string())
        }
        _ => BusError::Call(err.to_string()),
    }
}

fn from_zvalue(value: &Value<'_>) -> BusResult<BusValue> {
    Ok(match value {
        Value::Bool(v) => BusValue::Bool(*v),
        Value::U8(v) => BusValue::Byte(*v),
        Value::I16(v) => BusValue::Int16(*v),
        Value::U16(v) => BusValue::UInt16(*v),
        Value::I32(v) => BusValue::Int32(*v),
        Value::U32(v) => BusValue::UInt32(*v),
        Value::I64(v) => BusValue::Int64(*v),
        Value::U64(v) => BusValue::UInt64(*v),
        Value::F64(v) => BusValue::Double(*v),
        Value::Str(v) => BusValue::str(v.as_str()),
        Value::ObjectPath(v) => BusValue::str(v.as_str()),
        Value::Signature(v) => BusValue::str(v.as_str()),
        Value::Value(inner) => from_zvalue(inner)?,
        Value::Array(array) => BusValue::Array(
            array
                .iter()
                .map(from_zvalue)
                .collect::<BusResult<Vec<_>>>()?,
        ),
        Value::Dict(dict) => BusValue::Dict(
            dict.iter()
                .map(|(key, item)| Ok((from_zvalue(key)?, from_zvalue(item)?)))
                .collect::<BusResult<Vec<_>>>()?,
        ),
        Value::Structure(structure) => BusValue::Array(
            structure
                .fields()
                .iter()
                .map(from_zvalue)
                .collect::<BusResult<Vec<_>>>()?,
        ),
        other => return Err(BusError::Unsupported(format!("{other:?}"))),
    })
}

fn to_zvalue(value: &BusValue) -> BusResult<Value<'static>> {
    Ok(match value {
        BusValue::Bool(v) => Value::Bool(*v),
        BusValue::Byte(v) => Value::U8(*v),
        BusValue::Int16(v) => Value::I16(*v),
        BusValue::UInt16(v) => Value::U16(*v),
        BusValue::Int32(v) => Value::I32(*v),
        BusValue::UInt32(v) => Value::U32(*v),
        BusValue::Int64(v) => Value::I64(*v),
        BusValue::UInt64(v) => Value::U64(*v),
        BusValue::Double(v) => Value::F64(*v),
        BusValue::Str(v) => Value::from(v.clone()),
        BusValue::Array(_) | BusValue::Dict(_) => {
            return Err(BusError::Unsupported(
                "containers cannot be written to a bus item".to_string(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_nested_variants() {
        let value = Value::Value(Box::new(Value::I32(230)));
        assert_eq!(from_zvalue(&value).unwrap(), BusValue::Int32(230));
    }

    #[test]
    fn converts_strings() {
        assert_eq!(
            from_zvalue(&Value::from("Multiplus")).unwrap(),
            BusValue::str("Multiplus")
        );
    }

    #[test]
    fn scalar_write_arguments_keep_width() {
        assert_eq!(to_zvalue(&BusValue::UInt16(5)).unwrap(), Value::U16(5));
        assert_eq!(to_zvalue(&BusValue::Double(1.5)).unwrap(), Value::F64(1.5));
        assert!(matches!(
            to_zvalue(&BusValue::Array(vec![])),
            Err(BusError::Unsupported(_))
        ));
    }
}
