pub mod bus_client;
pub mod supervisor;
pub mod write_gate;

pub use bus_client::BusClient;
pub use supervisor::{Cycle, LifecycleCommand, LifecycleHandle, Supervisor, SupervisorState};
pub use write_gate::{WriteGate, WriteGateConfig};
