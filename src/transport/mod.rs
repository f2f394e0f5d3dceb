pub mod ws;

pub use ws::{Transport, TransportEvent, WsTransport};
