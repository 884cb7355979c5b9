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

//! Counter and synergy rankings derived from stored pair aggregates.
//!
//! Pure functions: rows in, sorted boards out. The advantage metric is the
//! pair win rate minus the hero's base win rate, so a hero that wins 60% of
//! everything does not read as "countered" by an opponent it beats 55% of
//! the time.

use std::cmp::Ordering;

use crate::database::models::{round4, HeroPairStat};

/// Base win rate assumed when the hero has no recorded games.
const NEUTRAL_BASE: f64 = 0.5;

/// A pair row enriched with the signed advantage against the base win rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedPair {
	pub hero_id: i32,
	pub games: i64,
	pub wins: i64,
	pub wr_vs: f64,
	pub advantage: f64,
}

/// Opponents split by sign of advantage: `counters` beat the hero more than
/// its base win rate predicts, `victims` less.
#[derive(Clone, Debug, Default)]
pub struct CounterBoard {
	/// Worst matchups first (most negative advantage).
	pub counters: Vec<RankedPair>,
	/// Best matchups first (largest advantage).
	pub victims: Vec<RankedPair>,
}

/// Allies split the same way.
#[derive(Clone, Debug, Default)]
pub struct SynergyBoard {
	pub best_allies: Vec<RankedPair>,
	pub worst_allies: Vec<RankedPair>,
}

pub fn rank_counters(rows: &[HeroPairStat], base_winrate: Option<f64>, limit: usize) -> CounterBoard {
	let (negative, non_negative) = split_by_advantage(rows, base_winrate, limit);
	CounterBoard { counters: negative, victims: non_negative }
}

pub fn rank_synergies(rows: &[HeroPairStat], base_winrate: Option<f64>, limit: usize) -> SynergyBoard {
	let (negative, non_negative) = split_by_advantage(rows, base_winrate, limit);
	SynergyBoard { best_allies: non_negative, worst_allies: negative }
}

/// Returns `(advantage < 0 ascending, advantage >= 0 descending)`, each
/// truncated to `limit`. Sorts are stable, so ties keep query order.
fn split_by_advantage(
	rows: &[HeroPairStat],
	base_winrate: Option<f64>,
	limit: usize,
) -> (Vec<RankedPair>, Vec<RankedPair>) {
	let base = base_winrate.unwrap_or(NEUTRAL_BASE);

	let mut negative = Vec::new();
	let mut non_negative = Vec::new();
	for row in rows {
		let entry = RankedPair {
			hero_id: row.hero_id,
			games: row.games,
			wins: row.wins,
			wr_vs: row.wr_vs,
			advantage: round4(row.wr_vs - base),
		};
		if entry.advantage < 0.0 {
			negative.push(entry);
		} else {
			non_negative.push(entry);
		}
	}

	negative.sort_by(|a, b| a.advantage.partial_cmp(&b.advantage).unwrap_or(Ordering::Equal));
	negative.truncate(limit);
	non_negative.sort_by(|a, b| b.advantage.partial_cmp(&a.advantage).unwrap_or(Ordering::Equal));
	non_negative.truncate(limit);
	(negative, non_negative)
}
