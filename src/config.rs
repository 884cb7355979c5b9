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

//! Runtime configuration, loaded once at start-up from the environment.

use std::{collections::HashSet, env, str::FromStr, time::Duration};

use crate::error::{ArchiveError, Result};

const DATABASE_VAR: &str = "DATABASE_URL";
const PROVIDER_VAR: &str = "PROVIDER_URL";
const API_KEY_VAR: &str = "API_KEY";

const DEFAULT_PROVIDER_URL: &str = "https://api.opendota.com/api";

/// Ranked All Pick in a ranked matchmaking lobby, the only pair admitted by
/// default.
pub const DEFAULT_ALLOWED_MODES: (i32, i32) = (22, 7);

#[derive(Clone, Debug)]
pub struct Config {
	/// Connection URL of the datastore (`sqlite:` or `postgres:`).
	pub database_url: String,
	/// Base URL of the upstream match-data provider.
	pub provider_url: String,
	/// Optional provider API key, forwarded as the `api_key` query parameter.
	pub api_key: Option<String>,
	/// Listing-loop cycle period.
	pub poll_interval: Duration,
	/// Process-wide ceiling on provider calls.
	pub max_requests_per_minute: u32,
	/// Size cap on the raw match table before eviction.
	pub max_matches: u64,
	/// Matches older than this many days are evicted.
	pub days_to_keep: u32,
	/// Retention-worker cadence.
	pub cleanup_interval: Duration,
	/// Upper bound on matches handled per listing cycle.
	pub max_matches_per_cycle: usize,
	/// Whether the detail endpoint is called; without it no hero data exists.
	pub fetch_match_details: bool,
	/// Enables the explorer (query) loop.
	pub use_explorer: bool,
	/// Explorer-loop cycle period.
	pub explorer_interval: Duration,
	/// Admitted `(game_mode, lobby_type)` pairs.
	pub allowed_modes: HashSet<(i32, i32)>,
	/// Matches shorter than this many seconds are stored but never aggregated.
	pub min_match_duration: i64,
	/// Opponent-aggregate cache validity.
	pub cache_ttl: Duration,
	/// Item IDs filtered out of player item slots on top of the built-in set.
	pub extra_junk_items: Vec<i64>,
}

impl Config {
	/// Read every recognized option from the environment. Unset options fall
	/// back to their defaults; set-but-unparseable options are fatal.
	pub fn from_env() -> Result<Self> {
		let database_url = env::var(DATABASE_VAR)
			.map_err(|_| ArchiveError::Config(format!("{} must be set", DATABASE_VAR)))?;

		let mut config = Self {
			database_url,
			provider_url: env::var(PROVIDER_VAR).unwrap_or_else(|_| DEFAULT_PROVIDER_URL.to_string()),
			api_key: env::var(API_KEY_VAR).ok().filter(|k| !k.is_empty()),
			poll_interval: Duration::from_secs(var_parse("POLL_INTERVAL_MINUTES", 15u64)? * 60),
			max_requests_per_minute: var_parse("MAX_REQUESTS_PER_MINUTE", 30u32)?,
			max_matches: var_parse("MAX_MATCHES", 300_000u64)?,
			days_to_keep: var_parse("DAYS_TO_KEEP", 90u32)?,
			cleanup_interval: Duration::from_secs(var_parse("CLEANUP_INTERVAL_HOURS", 24u64)? * 3600),
			max_matches_per_cycle: var_parse("MAX_MATCHES_PER_CYCLE", 50usize)?,
			fetch_match_details: var_truthy("FETCH_MATCH_DETAILS"),
			use_explorer: var_truthy("USE_EXPLORER"),
			explorer_interval: Duration::from_secs(var_parse("EXPLORER_INTERVAL_SECONDS", 300u64)?),
			allowed_modes: match env::var("ALLOWED_MODES") {
				Ok(raw) => parse_allowed_modes(&raw)?,
				Err(_) => [DEFAULT_ALLOWED_MODES].iter().copied().collect(),
			},
			min_match_duration: var_parse("MIN_MATCH_DURATION", 900i64)?,
			cache_ttl: Duration::from_secs(var_parse("CACHE_TTL_HOURS", 24u64)? * 3600),
			extra_junk_items: match env::var("EXTRA_JUNK_ITEMS") {
				Ok(raw) => parse_id_list(&raw)?,
				Err(_) => Vec::new(),
			},
		};

		if var_truthy("BOOTSTRAP_MODE") {
			config.apply_bootstrap();
		}
		if config.max_requests_per_minute == 0 {
			return Err(ArchiveError::Config("MAX_REQUESTS_PER_MINUTE must be positive".into()));
		}
		if config.allowed_modes.is_empty() {
			return Err(ArchiveError::Config("ALLOWED_MODES must admit at least one pair".into()));
		}
		Ok(config)
	}

	/// Aggressive first-fill overrides: short cycles, full listing pages and a
	/// raised request budget.
	fn apply_bootstrap(&mut self) {
		self.poll_interval = Duration::from_secs(5 * 60);
		self.max_matches_per_cycle = 100;
		self.max_requests_per_minute = 200;
	}

	/// Write the effective settings to the log, one line per option.
	pub fn log_summary(&self) {
		log::info!("  provider_url            = {}", self.provider_url);
		log::info!("  api_key                 = {}", if self.api_key.is_some() { "set" } else { "unset" });
		log::info!("  poll_interval           = {:?}", self.poll_interval);
		log::info!("  max_requests_per_minute = {}", self.max_requests_per_minute);
		log::info!("  max_matches             = {}", self.max_matches);
		log::info!("  days_to_keep            = {}", self.days_to_keep);
		log::info!("  cleanup_interval        = {:?}", self.cleanup_interval);
		log::info!("  max_matches_per_cycle   = {}", self.max_matches_per_cycle);
		log::info!("  fetch_match_details     = {}", self.fetch_match_details);
		log::info!("  use_explorer            = {}", self.use_explorer);
		log::info!("  explorer_interval       = {:?}", self.explorer_interval);
		log::info!("  allowed_modes           = {:?}", self.allowed_modes);
		log::info!("  min_match_duration      = {}s", self.min_match_duration);
		log::info!("  cache_ttl               = {:?}", self.cache_ttl);
	}
}

fn var_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
	match env::var(key) {
		Ok(raw) => raw
			.trim()
			.parse()
			.map_err(|_| ArchiveError::Config(format!("{} has unparseable value {:?}", key, raw))),
		Err(_) => Ok(default),
	}
}

/// Recognized truthy spellings are `1`, `true` and `yes`, case-insensitive.
/// Anything else, including unset, is false.
fn var_truthy(key: &str) -> bool {
	match env::var(key) {
		Ok(raw) => is_truthy(&raw),
		Err(_) => false,
	}
}

fn is_truthy(raw: &str) -> bool {
	matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Parse `"22:7,1:0"` into a set of `(game_mode, lobby_type)` pairs.
fn parse_allowed_modes(raw: &str) -> Result<HashSet<(i32, i32)>> {
	let mut modes = HashSet::new();
	for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
		let mut halves = part.splitn(2, ':');
		let pair = match (halves.next(), halves.next()) {
			(Some(gm), Some(lt)) => gm.trim().parse().ok().zip(lt.trim().parse().ok()),
			_ => None,
		};
		match pair {
			Some(p) => {
				modes.insert(p);
			}
			None => {
				return Err(ArchiveError::Config(format!(
					"ALLOWED_MODES entry {:?} is not of the form game_mode:lobby_type",
					part
				)))
			}
		}
	}
	Ok(modes)
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
	raw.split(',')
		.map(str::trim)
		.filter(|p| !p.is_empty())
		.map(|p| {
			p.parse()
				.map_err(|_| ArchiveError::Config(format!("EXTRA_JUNK_ITEMS entry {:?} is not an item id", p)))
		})
		.collect()
}
