// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Trellis crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`session`] - Scripted [`ScriptSession`](trellis_charts::ScriptSession) fake
//! - [`counting`] - Declarative chart that numbers ids from global counters
//! - [`fixtures`] - Spec and table fixtures
#![forbid(unsafe_code)]

pub mod config;
pub mod counting;
pub mod fixtures;
pub mod session;

// Re-export commonly used items at crate root for convenience
pub use config::InMemoryConfigStore;
pub use counting::{reset_counters, CountingChart};
pub use fixtures::{interval_selection_spec, layered_view_spec, sales_table, spec};
pub use session::FakeSession;
