// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Trellis tools (config, chart prefs).
//! Keeps runtime adapters thin and framework-agnostic.

pub mod config;
pub mod prefs;
