use crate::domain::{BusAddress, BusValue};
use crate::ports::bus::{BusConnector, BusError, BusPort, BusResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

type Key = (String, String);

/// Bus port holding items in memory, used as the test double for the
/// system bus.
#[derive(Default)]
pub struct InMemoryBus {
    items: RwLock<BTreeMap<Key, BusValue>>,
    extra_names: RwLock<Vec<String>>,
    rejections: RwLock<HashMap<Key, i32>>,
    ranges: RwLock<HashMap<Key, (f64, f64)>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, service: &str, path: &str, value: BusValue) {
        self.items
            .write()
            .expect("bus items poisoned")
            .insert(key(service, path), value);
    }

    /// Removes every item of `service`, as if its owner left the bus.
    pub fn remove_service(&self, service: &str) {
        self.items
            .write()
            .expect("bus items poisoned")
            .retain(|(owner, _), _| owner != service);
        self.extra_names
            .write()
            .expect("bus names poisoned")
            .retain(|name| name != service);
    }

    /// Registers a name without items (unique connection names, foreign
    /// services). Duplicates are kept.
    pub fn register_name(&self, name: &str) {
        self.extra_names
            .write()
            .expect("bus names poisoned")
            .push(name.to_string());
    }

    /// Makes `SetValue` on `service`/`path` answer with `status`.
    pub fn reject_writes(&self, service: &str, path: &str, status: i32) {
        self.rejections
            .write()
            .expect("bus rejections poisoned")
            .insert(key(service, path), status);
    }

    /// Clamps numeric writes on `service`/`path` into `min..=max`.
    pub fn clamp_writes(&self, service: &str, path: &str, min: f64, max: f64) {
        self.ranges
            .write()
            .expect("bus ranges poisoned")
            .insert(key(service, path), (min, max));
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn value(&self, service: &str, path: &str) -> Option<BusValue> {
        self.items
            .read()
            .expect("bus items poisoned")
            .get(&key(service, path))
            .cloned()
    }

    /// Number of accepted `SetValue` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> BusResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(BusError::Unavailable(
                "connection to the system bus was lost".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn lookup(&self, address: &BusAddress) -> BusResult<BusValue> {
        self.value(&address.service, &address.path)
            .ok_or_else(|| BusError::NoSuchObject {
                address: address.to_string(),
                message: "no item registered at this path".to_string(),
            })
    }

    fn clamp(&self, address: &BusAddress, value: BusValue) -> BusValue {
        let ranges = self.ranges.read().expect("bus ranges poisoned");
        let Some((min, max)) = ranges.get(&key(&address.service, &address.path)).copied() else {
            return value;
        };
        match value {
            BusValue::Double(v) => BusValue::Double(v.clamp(min, max)),
            other => match other.as_i64() {
                Some(v) => BusValue::Int32((v as f64).clamp(min, max) as i32),
                None => other,
            },
        }
    }
}

fn key(service: &str, path: &str) -> Key {
    (service.to_string(), path.to_string())
}

fn text_of(value: &BusValue) -> String {
    match value {
        BusValue::Str(s) => s.clone(),
        BusValue::Bool(v) => v.to_string(),
        BusValue::Double(v) => v.to_string(),
        BusValue::Array(items) if items.is_empty() => "---".to_string(),
        other => other
            .as_i64()
            .map(|v| v.to_string())
            .unwrap_or_else(|| format!("{other:?}")),
    }
}

#[async_trait]
impl BusPort for InMemoryBus {
    async fn get_value(&self, address: &BusAddress) -> BusResult<BusValue> {
        self.ensure_available()?;
        self.lookup(address)
    }

    async fn get_text(&self, address: &BusAddress) -> BusResult<String> {
        self.ensure_available()?;
        self.lookup(address).map(|value| text_of(&value))
    }

    async fn set_value(&self, address: &BusAddress, value: BusValue) -> BusResult<i32> {
        self.ensure_available()?;
        self.lookup(address)?;
        let item = key(&address.service, &address.path);
        if let Some(status) = self
            .rejections
            .read()
            .expect("bus rejections poisoned")
            .get(&item)
        {
            return Ok(*status);
        }
        let stored = self.clamp(address, value);
        self.items
            .write()
            .expect("bus items poisoned")
            .insert(item, stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    async fn list_names(&self) -> BusResult<Vec<String>> {
        self.ensure_available()?;
        let mut names = self.extra_names.read().expect("bus names poisoned").clone();
        names.extend(
            self.items
                .read()
                .expect("bus items poisoned")
                .keys()
                .map(|(service, _)| service.clone()),
        );
        Ok(names)
    }

    async fn get_items(&self, address: &BusAddress) -> BusResult<Vec<(String, BusValue)>> {
        self.ensure_available()?;
        let prefix = address.path.trim_end_matches('/');
        let items = self.items.read().expect("bus items poisoned");
        let entries: Vec<_> = items
            .iter()
            .filter(|((service, path), _)| {
                service == &address.service && path.starts_with(prefix) && path != prefix
            })
            .map(|((_, path), value)| {
                let item = BusValue::Dict(vec![
                    (BusValue::str("Text"), BusValue::Str(text_of(value))),
                    (BusValue::str("Value"), value.clone()),
                ]);
                (path.clone(), item)
            })
            .collect();
        if entries.is_empty() {
            return Err(BusError::NoSuchObject {
                address: address.to_string(),
                message: "service exposes no items".to_string(),
            });
        }
        Ok(entries)
    }
}

/// Hands out the same in-memory bus on every connect and counts the calls.
pub struct InMemoryConnector {
    bus: Arc<InMemoryBus>,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(bus: Arc<InMemoryBus>) -> Self {
        Self {
            bus,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusConnector for InMemoryConnector {
    async fn connect(&self) -> BusResult<Arc<dyn BusPort>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.bus.clone())
    }
}
