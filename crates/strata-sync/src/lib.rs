//! Offline/online synchronization for the strata property-management client.
//!
//! The engine keeps the UI working against local data while the network is
//! away, then reconciles:
//! - **ConnectivityMonitor**: single authoritative online/offline flag,
//!   fed by platform transition events
//! - **RemoteApi**: the REST boundary (`POST /{collection}`,
//!   `PUT /{collection}/{id}`, ...), with a reqwest implementation
//! - **SyncEngine**: drains the pending-mutation queue in FIFO order,
//!   reconciles temporary identifiers, refresh-pulls canonical state, and
//!   exposes read-through/write-through entity accessors

pub mod api;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;

pub use api::{ApiError, HttpRemoteApi, RemoteApi};
pub use config::ApiConfig;
pub use connectivity::ConnectivityMonitor;
pub use engine::{is_temp_id, SyncEngine, TEMP_ID_PREFIX};
pub use error::{Result, SyncError};
