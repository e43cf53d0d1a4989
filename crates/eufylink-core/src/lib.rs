//! State mirror for the eufy-security event server.
//!
//! A [`Coordinator`] keeps a local copy of the server's stations and
//! devices: a live snapshot taken when listening starts and patched by
//! `property changed` events, plus a per-device cache of transient
//! properties (motion, rings, RTSP URLs) that the snapshot never carries.
//! Consumers read both through an immutable [`MergedState`].
//!
//! ```rust,ignore
//! use eufylink_core::{Coordinator, CoordinatorConfig};
//!
//! let coordinator = Coordinator::new(CoordinatorConfig::for_server("127.0.0.1", 3000)?)?;
//! coordinator.initialize().await?;
//! let state = coordinator.refresh().await?;
//! println!("{}", serde_json::to_string_pretty(&*state)?);
//! ```

pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod session;
pub mod store;
pub mod stream;

pub use classify::{ClassificationTable, EventRule, EventTarget, builtin_rules};
pub use config::{CoordinatorConfig, FlagWait, FlagWaitSettings};
pub use coordinator::{ConnectionState, Coordinator};
pub use error::CoreError;
pub use session::{SessionFlag, SessionFlags};
pub use store::{Entity, LiveSnapshot, MergedState, PropertyCache, StateStore};
pub use stream::{StateStream, StateWatchStream};

// Wire types consumers need alongside the coordinator.
pub use eufylink_api::{DeviceType, OutboundCommand, ReconnectConfig, TransportEvent, TransportLink};
