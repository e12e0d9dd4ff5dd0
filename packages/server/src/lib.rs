// Helper execution engine - scheduling and dispatch core
//
// This crate provides a per-user task scheduler and dispatcher: users
// register scheduled background jobs ("helpers"), a central dispatcher
// pulls them off a temporally ordered priority queue and runs them near
// their scheduled moment, honouring priority, expiry, region, and admin
// gating. The scheduling core is storage-agnostic; production deployments
// back it with a Redis-compatible Scheduling Store.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;
