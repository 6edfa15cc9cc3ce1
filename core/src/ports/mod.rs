//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces the transport layer uses
//! to interact with the cluster. Implementations live in `kubernetes`.

mod cluster;

pub use cluster::{ClusterHandle, ForwardChannels};
