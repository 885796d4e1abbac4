//! mbot-console runtime: transport, timers, and the console event loop.
//!
//! The state machines live in `mbot-console-core`; this crate drives them
//! from a single tokio task against a robot bridge.

pub mod bridge;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod console;
pub mod export;
pub mod heartbeat;
pub mod map_poll;
pub mod scene;
pub mod subscriptions;

#[cfg(test)]
mod testing;
