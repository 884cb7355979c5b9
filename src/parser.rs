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

//! Normalization of full match payloads into canonical records.
//!
//! The parser is the strict boundary between the provider's loosely-typed
//! JSON and the store: a payload either becomes a fully validated
//! `MatchRecord` with its player rows, or is rejected with a reason code.
//! Raw payload maps never travel past this point.

use std::fmt;

use hashbrown::HashSet;

use crate::{
	config::Config,
	provider::{MatchDetail, PlayerDetail},
	types::{MatchPlayerRow, MatchRecord, RankBucket, TEAM_SIZE},
};

/// Consumable and utility item IDs that say nothing about a hero's build:
/// empty slot, clarity, healing salve, observer ward, sentry ward, tango,
/// town portal scroll, smoke of deceit, wind lace.
pub const JUNK_ITEM_IDS: [i64; 9] = [0, 38, 39, 42, 43, 44, 46, 188, 273];

/// A player slot below this value plays Radiant.
const RADIANT_SLOT_BOUND: i32 = 128;

/// Why a payload was refused. The code strings feed per-reason skip counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseReject {
	PlayerCount(usize),
	MissingHero,
	MissingSlot,
	TeamSplit { radiant: usize, dire: usize },
	DuplicateHero(i32),
}

impl ParseReject {
	pub fn code(&self) -> &'static str {
		match self {
			ParseReject::PlayerCount(_) => "player_count",
			ParseReject::MissingHero => "missing_hero",
			ParseReject::MissingSlot => "missing_slot",
			ParseReject::TeamSplit { .. } => "team_split",
			ParseReject::DuplicateHero(_) => "duplicate_hero",
		}
	}
}

impl fmt::Display for ParseReject {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ParseReject::PlayerCount(n) => write!(f, "expected 10 players, payload has {}", n),
			ParseReject::MissingHero => write!(f, "a player has a missing or zero hero id"),
			ParseReject::MissingSlot => write!(f, "a player has no player_slot"),
			ParseReject::TeamSplit { radiant, dire } => {
				write!(f, "team split is {}v{}, expected 5v5", radiant, dire)
			}
			ParseReject::DuplicateHero(id) => write!(f, "hero {} appears twice", id),
		}
	}
}

/// A validated match plus its per-player rows.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedMatch {
	pub record: MatchRecord,
	pub players: Vec<MatchPlayerRow>,
}

impl ParsedMatch {
	/// Substitute the rank hint from a listing summary when the detail
	/// payload carried no `avg_rank_tier`, recomputing the bucket.
	pub fn apply_rank_hint(&mut self, hint: Option<i32>) {
		if self.record.avg_rank_tier.is_none() {
			if let Some(tier) = hint {
				self.record.avg_rank_tier = Some(tier);
				self.record.rank_bucket = RankBucket::from_tier(Some(tier));
			}
		}
	}
}

pub struct MatchParser {
	junk_items: HashSet<i64>,
}

impl MatchParser {
	pub fn new(extra_junk: &[i64]) -> Self {
		let mut junk_items: HashSet<i64> = JUNK_ITEM_IDS.iter().copied().collect();
		junk_items.extend(extra_junk.iter().copied());
		Self { junk_items }
	}

	pub fn from_config(config: &Config) -> Self {
		Self::new(&config.extra_junk_items)
	}

	pub fn parse(&self, detail: &MatchDetail) -> Result<ParsedMatch, ParseReject> {
		if detail.players.len() != 2 * TEAM_SIZE {
			return Err(ParseReject::PlayerCount(detail.players.len()));
		}

		let mut radiant_heroes = Vec::with_capacity(TEAM_SIZE);
		let mut dire_heroes = Vec::with_capacity(TEAM_SIZE);
		let mut players = Vec::with_capacity(2 * TEAM_SIZE);
		for player in &detail.players {
			let hero_id = match player.hero_id {
				Some(id) if id > 0 => id,
				_ => return Err(ParseReject::MissingHero),
			};
			let slot = player.player_slot.ok_or(ParseReject::MissingSlot)?;
			let is_radiant = slot < RADIANT_SLOT_BOUND;
			if is_radiant {
				radiant_heroes.push(hero_id);
			} else {
				dire_heroes.push(hero_id);
			}
			players.push(self.player_row(player, hero_id, slot, is_radiant));
		}

		if radiant_heroes.len() != TEAM_SIZE || dire_heroes.len() != TEAM_SIZE {
			return Err(ParseReject::TeamSplit { radiant: radiant_heroes.len(), dire: dire_heroes.len() });
		}

		// implied by the split for well-formed upstream data; still checked
		let mut seen = HashSet::with_capacity(2 * TEAM_SIZE);
		for &hero in radiant_heroes.iter().chain(dire_heroes.iter()) {
			if !seen.insert(hero) {
				return Err(ParseReject::DuplicateHero(hero));
			}
		}

		let avg_rank_tier = detail.avg_rank_tier.filter(|&t| t != 0);
		let record = MatchRecord {
			match_id: detail.match_id,
			start_time: detail.start_time.unwrap_or(0),
			duration: detail.duration,
			patch: detail.patch.map(|p| p.to_string()),
			avg_rank_tier,
			rank_bucket: RankBucket::from_tier(avg_rank_tier),
			game_mode: detail.game_mode,
			lobby_type: detail.lobby_type,
			radiant_win: detail.radiant_win.unwrap_or(false),
			radiant_heroes,
			dire_heroes,
		};
		Ok(ParsedMatch { record, players })
	}

	fn player_row(&self, player: &PlayerDetail, hero_id: i32, slot: i32, is_radiant: bool) -> MatchPlayerRow {
		MatchPlayerRow {
			hero_id,
			player_slot: slot,
			is_radiant,
			lane: player.lane,
			lane_role: player.lane_role,
			gold_per_min: player.gold_per_min,
			xp_per_min: player.xp_per_min,
			kills: player.kills,
			deaths: player.deaths,
			assists: player.assists,
			hero_damage: player.hero_damage,
			tower_damage: player.tower_damage,
			obs_placed: player.obs_placed,
			sen_placed: player.sen_placed,
			last_hits: player.last_hits,
			denies: player.denies,
			hero_healing: player.hero_healing,
			net_worth: player.net_worth,
			items: self.core_items(player),
		}
	}

	/// Keep the first six non-junk item IDs in slot order, padded with None.
	fn core_items(&self, player: &PlayerDetail) -> [Option<i64>; 6] {
		let slots =
			[player.item_0, player.item_1, player.item_2, player.item_3, player.item_4, player.item_5];
		let mut items = [None; 6];
		let mut next = 0;
		for id in slots.iter().filter_map(|slot| *slot) {
			if !self.junk_items.contains(&id) {
				items[next] = Some(id);
				next += 1;
			}
		}
		items
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::MatchDetail;

	fn player(hero_id: i32, slot: i32) -> PlayerDetail {
		PlayerDetail { hero_id: Some(hero_id), player_slot: Some(slot), ..Default::default() }
	}

	fn detail(radiant: [i32; 5], dire: [i32; 5]) -> MatchDetail {
		let mut players = Vec::new();
		for (i, hero) in radiant.iter().enumerate() {
			players.push(player(*hero, i as i32));
		}
		for (i, hero) in dire.iter().enumerate() {
			players.push(player(*hero, 128 + i as i32));
		}
		MatchDetail {
			match_id: 1,
			start_time: Some(1_700_000_000),
			duration: Some(1800),
			patch: Some(57),
			avg_rank_tier: Some(42),
			game_mode: Some(22),
			lobby_type: Some(7),
			radiant_win: Some(true),
			players,
		}
	}

	#[test]
	fn well_formed_payload_parses() {
		let parser = MatchParser::new(&[]);
		let parsed = parser.parse(&detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10])).unwrap();
		assert_eq!(parsed.record.radiant_heroes, vec![1, 2, 3, 4, 5]);
		assert_eq!(parsed.record.dire_heroes, vec![6, 7, 8, 9, 10]);
		assert_eq!(parsed.record.patch.as_deref(), Some("57"));
		assert_eq!(parsed.record.rank_bucket, RankBucket::High);
		assert!(parsed.record.radiant_win);
		assert_eq!(parsed.players.len(), 10);
		assert!(parsed.players[0].is_radiant);
		assert!(!parsed.players[5].is_radiant);
	}

	#[test]
	fn rejects_short_rosters() {
		let parser = MatchParser::new(&[]);
		let mut d = detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10]);
		d.players.pop();
		assert_eq!(parser.parse(&d), Err(ParseReject::PlayerCount(9)));
	}

	#[test]
	fn rejects_zero_hero() {
		let parser = MatchParser::new(&[]);
		let mut d = detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10]);
		d.players[3].hero_id = Some(0);
		assert_eq!(parser.parse(&d), Err(ParseReject::MissingHero));
		d.players[3].hero_id = None;
		assert_eq!(parser.parse(&d), Err(ParseReject::MissingHero));
	}

	#[test]
	fn rejects_lopsided_split() {
		let parser = MatchParser::new(&[]);
		let mut d = detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10]);
		// move one dire player to a radiant slot
		d.players[9].player_slot = Some(4);
		assert_eq!(parser.parse(&d), Err(ParseReject::TeamSplit { radiant: 6, dire: 4 }));
	}

	#[test]
	fn rejects_duplicate_hero_across_teams() {
		let parser = MatchParser::new(&[]);
		let d = detail([1, 2, 3, 4, 5], [5, 7, 8, 9, 10]);
		assert_eq!(parser.parse(&d), Err(ParseReject::DuplicateHero(5)));
	}

	#[test]
	fn junk_items_are_dropped_in_slot_order() {
		let parser = MatchParser::new(&[]);
		let mut d = detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10]);
		d.players[0].item_0 = Some(44); // tango
		d.players[0].item_1 = Some(1); // blink
		d.players[0].item_2 = Some(0); // empty
		d.players[0].item_3 = Some(116); // bkb
		d.players[0].item_4 = Some(46); // tp scroll
		d.players[0].item_5 = Some(108);
		let parsed = parser.parse(&d).unwrap();
		assert_eq!(parsed.players[0].items, [Some(1), Some(116), Some(108), None, None, None]);
	}

	#[test]
	fn configured_junk_extends_the_builtin_set() {
		let parser = MatchParser::new(&[216]);
		let mut d = detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10]);
		d.players[1].item_0 = Some(216);
		d.players[1].item_1 = Some(50);
		let parsed = parser.parse(&d).unwrap();
		assert_eq!(parsed.players[1].items, [Some(50), None, None, None, None, None]);
	}

	#[test]
	fn missing_tier_defers_to_hint() {
		let parser = MatchParser::new(&[]);
		let mut d = detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10]);
		d.avg_rank_tier = None;
		let mut parsed = parser.parse(&d).unwrap();
		assert_eq!(parsed.record.rank_bucket, RankBucket::Unknown);

		parsed.apply_rank_hint(Some(55));
		assert_eq!(parsed.record.avg_rank_tier, Some(55));
		assert_eq!(parsed.record.rank_bucket, RankBucket::VeryHigh);

		// a present tier is never overwritten
		parsed.apply_rank_hint(Some(10));
		assert_eq!(parsed.record.avg_rank_tier, Some(55));
	}

	#[test]
	fn zero_tier_counts_as_unknown() {
		let parser = MatchParser::new(&[]);
		let mut d = detail([1, 2, 3, 4, 5], [6, 7, 8, 9, 10]);
		d.avg_rank_tier = Some(0);
		let parsed = parser.parse(&d).unwrap();
		assert_eq!(parsed.record.avg_rank_tier, None);
		assert_eq!(parsed.record.rank_bucket, RankBucket::Unknown);
	}
}
