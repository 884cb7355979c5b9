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

//! TTL-bounded cache of the provider's per-hero opponent aggregates.
//!
//! A soft cache: user-facing reads prefer stale rows over no rows, so a
//! provider outage degrades to slightly old numbers instead of an error, as
//! long as the hero has been looked up before.

use std::{cmp::Ordering, sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
	database::{
		models::{round4, OpponentCacheRow},
		Database,
	},
	error::Result,
	governor::RateGovernor,
	provider::MatchSource,
};

pub struct OpponentStatsCache {
	db: Database,
	source: Arc<dyn MatchSource>,
	ttl: Duration,
	governor: Option<Arc<RateGovernor>>,
}

impl OpponentStatsCache {
	pub fn new(db: Database, source: Arc<dyn MatchSource>, ttl: Duration) -> Self {
		Self { db, source, ttl, governor: None }
	}

	/// Route refresh calls through the shared provider budget. Reads served
	/// from cache are unaffected.
	pub fn with_governor(mut self, governor: Arc<RateGovernor>) -> Self {
		self.governor = Some(governor);
		self
	}

	/// Cached opponent rows for `hero_id`, best winrate first.
	///
	/// Fresh cache rows are returned as-is. Expired or missing rows trigger a
	/// provider refresh that atomically replaces the hero's rows; if the
	/// provider fails and stale rows exist, those are returned instead.
	pub async fn get(&self, hero_id: i32) -> Result<Vec<OpponentCacheRow>> {
		let cached = self.db.opponent_cache_rows(hero_id).await?;
		let now = Utc::now().timestamp();
		let newest = cached.iter().map(|row| row.updated_at).max();
		let fresh = newest.map(|at| now - at < self.ttl.as_secs() as i64).unwrap_or(false);

		if fresh && !cached.is_empty() {
			log::info!("opponent cache HIT hero_id={} ({} rows)", hero_id, cached.len());
			return Ok(cached);
		}
		log::info!("opponent cache MISS hero_id={}, refreshing from provider", hero_id);

		if let Some(governor) = &self.governor {
			governor.acquire().await;
		}
		let fetched = match self.source.fetch_hero_opponent_aggregates(hero_id).await {
			Ok(entries) => entries,
			Err(err) => {
				if !cached.is_empty() {
					log::warn!(
						"opponent cache refresh failed for hero_id={} ({}), serving {} stale rows",
						hero_id,
						err,
						cached.len()
					);
					return Ok(cached);
				}
				return Err(err);
			}
		};

		let mut rows: Vec<OpponentCacheRow> = fetched
			.into_iter()
			.filter_map(|entry| {
				let opponent_hero_id = entry.hero_id.filter(|&id| id > 0)?;
				if entry.games_played <= 0 {
					return None;
				}
				Some(OpponentCacheRow {
					opponent_hero_id,
					games: entry.games_played,
					wins: entry.wins,
					winrate: round4(entry.wins as f64 / entry.games_played as f64),
					updated_at: now,
				})
			})
			.collect();
		rows.sort_by(|a, b| b.winrate.partial_cmp(&a.winrate).unwrap_or(Ordering::Equal));

		self.db.replace_opponent_cache(hero_id, &rows).await?;
		log::info!("opponent cache stored {} rows for hero_id={}", rows.len(), hero_id);
		Ok(rows)
	}
}
