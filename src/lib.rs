// Copyright 2024-2026 The dota-archive authors.
// This file is part of dota-archive.

// dota-archive is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// dota-archive is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
// You should have received a copy of the GNU General Public License
// along with dota-archive.  If not, see <http://www.gnu.org/licenses/>.

//! Match-statistics ingestion and aggregation core for a Dota 2 analytics
//! backend. Polls the upstream provider for recent matches, persists the raw
//! records, and incrementally maintains per-hero win totals, cross-team
//! matchup pairs and same-team synergy pairs over a bounded rolling window.

#![forbid(unsafe_code)]
#![deny(dead_code)]

pub mod config;
pub mod database;
mod error;
pub mod governor;
pub mod logger;
pub mod matchups;
pub mod parser;
pub mod provider;
pub mod ranker;
pub mod tokens;
pub mod types;
pub mod workers;

pub use self::config::Config;
pub use self::database::{queries, Database, DatabaseConfig, SaveOutcome};
pub use self::error::{ArchiveError, Result};
pub use self::governor::RateGovernor;
pub use self::matchups::OpponentStatsCache;
pub use self::parser::{MatchParser, ParseReject, ParsedMatch};
pub use self::provider::{MatchSource, ProviderClient};
pub use self::tokens::TokenStore;
pub use self::workers::{System, WorkerContext};

#[cfg(test)]
pub(crate) use test::initialize;
