//! Host-facing command contract and JSON bridge for native frontends.

pub mod channel;
pub mod contract;
pub mod stdio;
