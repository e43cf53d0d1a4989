// eufylink-api: WebSocket transport and wire protocol for the eufy-security event server

pub mod error;
pub mod protocol;
pub mod websocket;

pub use error::Error;
pub use protocol::{
    CommandTarget, DeviceType, EventFrame, Inbound, OutboundCommand, ResultFrame,
    POLL_REFRESH_ID, START_LISTENING_ID,
};
pub use websocket::{
    LinkSender, ReconnectConfig, TransportEvent, TransportLink, TransportPeer, WebSocketLink,
};
