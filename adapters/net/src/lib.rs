#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Network relay that lets one player host a Root Racer room.
//!
//! The host process owns the only authoritative [`root_racer_world::World`].
//! Guests connect over WebSockets, exchange JSON frames described in
//! [`root_racer_core::protocol`], and mirror whatever state the host sends.

mod client;
mod error;
mod host;
pub mod invite;

pub use client::{RemoteRoom, RoomSender, RoomUpdate, RoomUpdates};
pub use error::NetError;
pub use host::{Host, HostConfig, HostHandle};
