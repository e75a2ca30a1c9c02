//! Real-time chat
//!
//! - `registry`: the set of live connections
//! - `broadcast`: fan-out of one frame to every connection
//! - `gateway`: per-connection read loop, persistence and shutdown

pub mod broadcast;
pub mod frame;
pub mod gateway;
pub mod registry;

pub use broadcast::{Broadcaster, FanoutReport};
pub use frame::{Frame, InboundMessage};
pub use gateway::{ChatGateway, ConnectionState, GatewayError, GatewaySettings};
pub use registry::{ConnectionEntry, ConnectionHandle, ConnectionRegistry};
