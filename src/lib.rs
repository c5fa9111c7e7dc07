// Copyright 2026 MelhorCarro Contributors
// SPDX-License-Identifier: Apache-2.0

//! MelhorCarro core — unified car-listing aggregation and ranking.
//!
//! Scrapes six Brazilian marketplaces through pluggable acquisition
//! strategies, normalizes every listing into one canonical record schema,
//! and ranks the result by user preferences. This library crate exposes the
//! core modules for integration testing.

pub mod acquisition;
pub mod aggregator;
pub mod cancel;
pub mod events;
pub mod export;
pub mod extract;
pub mod filters;
pub mod portals;
pub mod protocol;
pub mod rank;
pub mod record;
pub mod text;
