//! Alert routing and assignment engine.
//!
//! Assigns incoming alerts to capacity-constrained agents according to
//! prioritized, conditionally-matched rules, prevents overcommitting any
//! agent, and recovers work that goes unhandled. Invoked in-process by an
//! external service layer; the only trigger surface is the four
//! `RoutingEngine` operations (`route`, `resolve`, `reassign`,
//! `handle_stale`).

pub mod alert;
pub mod assignment;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod reaper;
pub mod rule;
pub mod selector;
pub mod stats;
pub mod store;
pub mod types;
