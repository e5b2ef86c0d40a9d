//! Duplex channel to the agent server
//!
//! The transport is an ordered, reliable, message-oriented channel carrying
//! one JSON object per frame in each direction. Reconnection policy is the
//! operator's concern, not this module's.

mod client;

pub use client::AgentClient;
