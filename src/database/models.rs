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

//! Row types read back out of the datastore.

use crate::error::Result;

/// Round a derived rate to four decimals, the precision served to readers.
pub fn round4(value: f64) -> f64 {
	(value * 10_000.0).round() / 10_000.0
}

/// Per-hero running totals from `hero_stats`.
#[derive(Clone, Copy, Debug, sqlx::FromRow)]
pub struct HeroStatRow {
	pub hero_id: i32,
	pub games: i64,
	pub wins: i64,
}

/// One canonical pair row from `hero_matchups`. `wins_a` counts wins by
/// `hero_a`, the smaller ID.
#[derive(Clone, Copy, Debug, sqlx::FromRow)]
pub struct MatchupPairRow {
	pub hero_a: i32,
	pub hero_b: i32,
	pub games: i64,
	pub wins_a: i64,
}

impl MatchupPairRow {
	/// Wins from `hero_id`'s side of this pair.
	pub fn wins_for(&self, hero_id: i32) -> i64 {
		if self.hero_a == hero_id {
			self.wins_a
		} else {
			self.games - self.wins_a
		}
	}

	pub fn opponent_of(&self, hero_id: i32) -> i32 {
		if self.hero_a == hero_id {
			self.hero_b
		} else {
			self.hero_a
		}
	}
}

/// One canonical pair row from `hero_synergy`. Both heroes share a team, so
/// `wins` counts wins for either of them.
#[derive(Clone, Copy, Debug, sqlx::FromRow)]
pub struct SynergyPairRow {
	pub hero_a: i32,
	pub hero_b: i32,
	pub games: i64,
	pub wins: i64,
}

impl SynergyPairRow {
	pub fn ally_of(&self, hero_id: i32) -> i32 {
		if self.hero_a == hero_id {
			self.hero_b
		} else {
			self.hero_a
		}
	}
}

/// A matchup or synergy row resolved from one hero's point of view:
/// `hero_id` is the opposing (or allied) hero and `wr_vs` that hero-pair's
/// win rate for the queried hero, rounded to four decimals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeroPairStat {
	pub hero_id: i32,
	pub games: i64,
	pub wins: i64,
	pub wr_vs: f64,
}

impl HeroPairStat {
	pub fn new(hero_id: i32, games: i64, wins: i64) -> Self {
		let wr_vs = if games > 0 { round4(wins as f64 / games as f64) } else { 0.0 };
		Self { hero_id, games, wins, wr_vs }
	}
}

/// One row of the external opponent-aggregate cache.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct OpponentCacheRow {
	pub opponent_hero_id: i32,
	pub games: i64,
	pub wins: i64,
	pub winrate: f64,
	pub updated_at: i64,
}

/// The slice of a stored match the aggregate rebuild reads back.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RebuildSourceRow {
	pub radiant_win: i32,
	pub radiant_heroes: String,
	pub dire_heroes: String,
}

impl RebuildSourceRow {
	pub fn decode(&self) -> Result<(bool, Vec<i32>, Vec<i32>)> {
		Ok((self.radiant_win != 0, decode_heroes(&self.radiant_heroes)?, decode_heroes(&self.dire_heroes)?))
	}
}

/// Hero-list columns are stored as JSON-encoded integer arrays, readable by
/// both supported engines and by external tooling.
pub fn encode_heroes(heroes: &[i32]) -> Result<String> {
	Ok(serde_json::to_string(heroes)?)
}

pub fn decode_heroes(raw: &str) -> Result<Vec<i32>> {
	Ok(serde_json::from_str(raw)?)
}
