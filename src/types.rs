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

//! Canonical domain types shared by the parser, the store and the workers.

use serde::{Deserialize, Serialize};

/// Players per team; every stored match is a full 5v5.
pub const TEAM_SIZE: usize = 5;

/// Coarse skill bracket derived from the provider's `avg_rank_tier`.
/// The tier boundaries are part of the contract with downstream readers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankBucket {
	Unknown,
	Low,
	Mid,
	High,
	VeryHigh,
	Immortal,
}

impl RankBucket {
	pub fn from_tier(tier: Option<i32>) -> Self {
		match tier {
			None | Some(0) => RankBucket::Unknown,
			Some(t) if t < 0 => RankBucket::Unknown,
			Some(t) if t <= 20 => RankBucket::Low,
			Some(t) if t <= 35 => RankBucket::Mid,
			Some(t) if t <= 50 => RankBucket::High,
			Some(t) if t <= 60 => RankBucket::VeryHigh,
			Some(_) => RankBucket::Immortal,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			RankBucket::Unknown => "unknown",
			RankBucket::Low => "low",
			RankBucket::Mid => "mid",
			RankBucket::High => "high",
			RankBucket::VeryHigh => "very_high",
			RankBucket::Immortal => "immortal",
		}
	}

	pub fn from_str_lossy(raw: &str) -> Self {
		match raw {
			"low" => RankBucket::Low,
			"mid" => RankBucket::Mid,
			"high" => RankBucket::High,
			"very_high" => RankBucket::VeryHigh,
			"immortal" => RankBucket::Immortal,
			_ => RankBucket::Unknown,
		}
	}
}

/// A normalized match, ready for the store. Immutable once written.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
	pub match_id: i64,
	pub start_time: i64,
	pub duration: Option<i64>,
	pub patch: Option<String>,
	pub avg_rank_tier: Option<i32>,
	pub rank_bucket: RankBucket,
	pub game_mode: Option<i32>,
	pub lobby_type: Option<i32>,
	pub radiant_win: bool,
	/// Exactly five distinct hero IDs, in player-slot order.
	pub radiant_heroes: Vec<i32>,
	/// Exactly five distinct hero IDs, disjoint from `radiant_heroes`.
	pub dire_heroes: Vec<i32>,
}

/// Per-player stats attached to a match, unique on `(match_id, player_slot)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchPlayerRow {
	pub hero_id: i32,
	pub player_slot: i32,
	pub is_radiant: bool,
	pub lane: Option<i32>,
	pub lane_role: Option<i32>,
	pub gold_per_min: Option<i32>,
	pub xp_per_min: Option<i32>,
	pub kills: Option<i32>,
	pub deaths: Option<i32>,
	pub assists: Option<i32>,
	pub hero_damage: Option<i64>,
	pub tower_damage: Option<i64>,
	pub obs_placed: Option<i32>,
	pub sen_placed: Option<i32>,
	pub last_hits: Option<i32>,
	pub denies: Option<i32>,
	pub hero_healing: Option<i64>,
	pub net_worth: Option<i64>,
	/// Core items in original slot order, junk filtered, padded to six.
	pub items: [Option<i64>; 6],
}

/// Order a hero pair canonically: the smaller ID first. Every pair-aggregate
/// row is keyed this way, which is what makes the pair tables duplicate-free.
pub fn canonical_pair(x: i32, y: i32) -> (i32, i32) {
	if x < y {
		(x, y)
	} else {
		(y, x)
	}
}
