pub mod bus;
pub mod codec;
pub mod write_gate;

pub use bus::{BusAddress, BusValue};
pub use codec::CodecError;
pub use write_gate::{GateDetails, GateReason, WriteGateDecision};
