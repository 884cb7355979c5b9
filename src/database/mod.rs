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

//! IO for the relational datastore behind the archive.
//!
//! One `Database` handle owns the pool and the store policy. Matches and
//! their aggregate deltas commit in a single transaction, so readers never
//! observe a match row without its aggregate contribution or vice versa. The
//! URL scheme picks the engine; every statement is written in the SQL subset
//! shared by SQLite ≥ 3.24 and PostgreSQL ≥ 9.5.

mod batch;
pub mod migrations;
pub mod models;
pub mod queries;

use std::{collections::HashSet, sync::Arc};

use itertools::Itertools;
use sqlx::{
	any::{Any, AnyPool, AnyPoolOptions},
	pool::PoolConnection,
};

use self::batch::Batch;
pub use self::models::*;
use crate::{
	config::Config,
	error::{ArchiveError, Result},
	types::{canonical_pair, MatchPlayerRow, MatchRecord},
};

pub type DbConn = PoolConnection<Any>;

type PairCounts = hashbrown::HashMap<(i32, i32), (i64, i64)>;
type HeroCounts = hashbrown::HashMap<i32, (i64, i64)>;

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
	/// Datastore URL (`sqlite:` or `postgres:`).
	pub url: String,
	/// Admitted `(game_mode, lobby_type)` pairs; anything else is refused.
	pub allowed_modes: HashSet<(i32, i32)>,
	/// Matches shorter than this never contribute to aggregates.
	pub min_match_duration: i64,
}

impl DatabaseConfig {
	pub fn from_config(config: &Config) -> Self {
		Self {
			url: config.database_url.clone(),
			allowed_modes: config.allowed_modes.clone(),
			min_match_duration: config.min_match_duration,
		}
	}
}

/// What `save_match` did with the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
	/// New match, aggregates updated.
	Inserted,
	/// Re-ingestion of a known ID; nothing changed.
	AlreadyKnown,
	/// New match below the duration threshold; raw row kept for audit,
	/// aggregates untouched.
	StoredWithoutAggregates,
}

#[derive(Clone)]
pub struct Database {
	/// pool of datastore connections
	pool: AnyPool,
	allowed_modes: Arc<HashSet<(i32, i32)>>,
	min_match_duration: i64,
}

impl Database {
	/// Run migrations, then connect. The entry point for binaries and tests.
	pub async fn setup(config: &DatabaseConfig) -> Result<Self> {
		migrations::migrate(&config.url).await?;
		Self::new(config).await
	}

	/// Connect to an already-migrated datastore. Verifies schema presence and
	/// version before handing the pool out.
	pub async fn new(config: &DatabaseConfig) -> Result<Self> {
		let pool = AnyPoolOptions::new().min_connections(1).max_connections(10).connect(&config.url).await?;
		let mut conn = pool.acquire().await?;
		match migrations::version(&mut conn).await? {
			Some(found) if found == migrations::SCHEMA_VERSION => {}
			found => return Err(ArchiveError::SchemaVersion { found, expected: migrations::SCHEMA_VERSION }),
		}
		drop(conn);
		Ok(Self {
			pool,
			allowed_modes: Arc::new(config.allowed_modes.clone()),
			min_match_duration: config.min_match_duration,
		})
	}

	pub async fn conn(&self) -> Result<DbConn> {
		self.pool.acquire().await.map_err(Into::into)
	}

	pub fn pool(&self) -> &AnyPool {
		&self.pool
	}

	pub async fn match_exists(&self, match_id: i64) -> Result<bool> {
		let mut conn = self.conn().await?;
		queries::match_exists(&mut conn, match_id).await
	}

	/// Persist one match and fold it into the aggregates, all in a single
	/// transaction. Idempotent on `match_id`: re-ingesting a known ID commits
	/// nothing.
	pub async fn save_match(&self, record: &MatchRecord, players: &[MatchPlayerRow]) -> Result<SaveOutcome> {
		// refuse modes the pipeline filter should have caught
		let admitted = match (record.game_mode, record.lobby_type) {
			(Some(gm), Some(lt)) => self.allowed_modes.contains(&(gm, lt)),
			_ => false,
		};
		if !admitted {
			log::error!(
				"match {} with mode ({:?}, {:?}) reached the store past the pipeline filter; refusing write",
				record.match_id,
				record.game_mode,
				record.lobby_type
			);
			return Err(ArchiveError::GameModeHardBlocked {
				match_id: record.match_id,
				game_mode: record.game_mode,
				lobby_type: record.lobby_type,
			});
		}

		let radiant_encoded = encode_heroes(&record.radiant_heroes)?;
		let dire_encoded = encode_heroes(&record.dire_heroes)?;

		let mut tx = self.pool.begin().await?;

		let inserted = sqlx::query(
			"INSERT INTO matches \
				(match_id, start_time, duration, patch, avg_rank_tier, rank_bucket, \
				 game_mode, lobby_type, radiant_win, radiant_heroes, dire_heroes) \
			 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
			 ON CONFLICT (match_id) DO NOTHING",
		)
		.bind(record.match_id)
		.bind(record.start_time)
		.bind(record.duration)
		.bind(record.patch.as_deref())
		.bind(record.avg_rank_tier)
		.bind(record.rank_bucket.as_str())
		.bind(record.game_mode)
		.bind(record.lobby_type)
		.bind(record.radiant_win as i32)
		.bind(radiant_encoded.as_str())
		.bind(dire_encoded.as_str())
		.execute(&mut *tx)
		.await?
		.rows_affected();

		if inserted == 0 {
			// already stored; leave the aggregates alone
			tx.commit().await?;
			return Ok(SaveOutcome::AlreadyKnown);
		}

		for player in players {
			insert_player(&mut tx, record.match_id, player).await?;
		}

		// matches below the duration threshold are kept for audit but do not
		// influence analytics
		let aggregate = match record.duration {
			Some(duration) => duration >= self.min_match_duration,
			None => true,
		};
		if aggregate {
			apply_aggregate_deltas(&mut tx, record).await?;
		}

		tx.commit().await?;
		Ok(if aggregate { SaveOutcome::Inserted } else { SaveOutcome::StoredWithoutAggregates })
	}

	pub async fn matchup_rows(&self, hero_id: i32, min_games: i64) -> Result<Vec<HeroPairStat>> {
		let mut conn = self.conn().await?;
		queries::matchup_rows(&mut conn, hero_id, min_games).await
	}

	pub async fn synergy_rows(&self, hero_id: i32, min_games: i64) -> Result<Vec<HeroPairStat>> {
		let mut conn = self.conn().await?;
		queries::synergy_rows(&mut conn, hero_id, min_games).await
	}

	pub async fn base_winrate(&self, hero_id: i32) -> Result<Option<f64>> {
		let mut conn = self.conn().await?;
		queries::base_winrate(&mut conn, hero_id).await
	}

	pub async fn total_games(&self, hero_id: i32) -> Result<i64> {
		let mut conn = self.conn().await?;
		queries::total_games(&mut conn, hero_id).await
	}

	pub async fn matches_count(&self) -> Result<i64> {
		let mut conn = self.conn().await?;
		queries::matches_count(&mut conn).await
	}

	pub async fn match_ids_older_than(&self, cutoff: i64) -> Result<Vec<i64>> {
		let mut conn = self.conn().await?;
		queries::match_ids_older_than(&mut conn, cutoff).await
	}

	pub async fn oldest_match_ids(&self, count: i64) -> Result<Vec<i64>> {
		let mut conn = self.conn().await?;
		queries::oldest_match_ids(&mut conn, count).await
	}

	/// Delete the given matches, then rebuild all three aggregate tables from
	/// what remains. One transaction: readers see the old state or the new,
	/// never a half-evicted one.
	pub async fn evict_and_rebuild(&self, match_ids: &[i64]) -> Result<()> {
		if match_ids.is_empty() {
			return Ok(());
		}
		let mut tx = self.pool.begin().await?;
		delete_by_match_ids(&mut tx, "match_players", match_ids).await?;
		let deleted = delete_by_match_ids(&mut tx, "matches", match_ids).await?;
		let (stat_rows, matchup_rows, synergy_rows) =
			rebuild_aggregates(&mut tx, self.min_match_duration).await?;
		let remaining = queries::matches_count(&mut tx).await?;
		tx.commit().await?;
		log::info!(
			"eviction done: deleted {} matches, remaining={}, matchup_pairs={}, synergy_pairs={}, heroes={}",
			deleted,
			remaining,
			matchup_rows,
			synergy_rows,
			stat_rows
		);
		Ok(())
	}

	/// Rebuild all aggregates from the retained matches without deleting
	/// anything. Admin entry point.
	pub async fn recalculate_all(&self) -> Result<()> {
		let mut tx = self.pool.begin().await?;
		let (stat_rows, matchup_rows, synergy_rows) =
			rebuild_aggregates(&mut tx, self.min_match_duration).await?;
		tx.commit().await?;
		log::info!(
			"full recalculation done: heroes={}, matchup_pairs={}, synergy_pairs={}",
			stat_rows,
			matchup_rows,
			synergy_rows
		);
		Ok(())
	}

	pub async fn opponent_cache_rows(&self, hero_id: i32) -> Result<Vec<OpponentCacheRow>> {
		let mut conn = self.conn().await?;
		queries::opponent_cache_rows(&mut conn, hero_id).await
	}

	/// Replace every cached opponent row for `hero_id` in one transaction, so
	/// concurrent readers see the full old set or the full new set.
	pub async fn replace_opponent_cache(&self, hero_id: i32, rows: &[OpponentCacheRow]) -> Result<()> {
		let mut tx = self.pool.begin().await?;
		sqlx::query("DELETE FROM hero_matchups_cache WHERE hero_id = $1")
			.bind(hero_id)
			.execute(&mut *tx)
			.await?;
		for row in rows {
			sqlx::query(
				"INSERT INTO hero_matchups_cache \
					(hero_id, opponent_hero_id, games, wins, winrate, updated_at) \
				 VALUES ($1, $2, $3, $4, $5, $6)",
			)
			.bind(hero_id)
			.bind(row.opponent_hero_id)
			.bind(row.games)
			.bind(row.wins)
			.bind(row.winrate)
			.bind(row.updated_at)
			.execute(&mut *tx)
			.await?;
		}
		tx.commit().await?;
		Ok(())
	}
}

async fn insert_player(
	tx: &mut sqlx::Transaction<'_, Any>,
	match_id: i64,
	player: &MatchPlayerRow,
) -> Result<()> {
	sqlx::query(
		"INSERT INTO match_players \
			(match_id, player_slot, hero_id, is_radiant, lane, lane_role, gold_per_min, xp_per_min, \
			 kills, deaths, assists, hero_damage, tower_damage, obs_placed, sen_placed, last_hits, \
			 denies, hero_healing, net_worth, item0, item1, item2, item3, item4, item5) \
		 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
			 $19, $20, $21, $22, $23, $24, $25) \
		 ON CONFLICT (match_id, player_slot) DO NOTHING",
	)
	.bind(match_id)
	.bind(player.player_slot)
	.bind(player.hero_id)
	.bind(player.is_radiant as i32)
	.bind(player.lane)
	.bind(player.lane_role)
	.bind(player.gold_per_min)
	.bind(player.xp_per_min)
	.bind(player.kills)
	.bind(player.deaths)
	.bind(player.assists)
	.bind(player.hero_damage)
	.bind(player.tower_damage)
	.bind(player.obs_placed)
	.bind(player.sen_placed)
	.bind(player.last_hits)
	.bind(player.denies)
	.bind(player.hero_healing)
	.bind(player.net_worth)
	.bind(player.items[0])
	.bind(player.items[1])
	.bind(player.items[2])
	.bind(player.items[3])
	.bind(player.items[4])
	.bind(player.items[5])
	.execute(&mut **tx)
	.await?;
	Ok(())
}

/// Per-hero totals, the 25 cross-team pairs and the ten same-team pairs per
/// side, applied as conflict-upserts.
async fn apply_aggregate_deltas(tx: &mut sqlx::Transaction<'_, Any>, record: &MatchRecord) -> Result<()> {
	let teams =
		[(&record.radiant_heroes, record.radiant_win), (&record.dire_heroes, !record.radiant_win)];

	for (heroes, team_won) in &teams {
		for &hero in heroes.iter() {
			sqlx::query(
				"INSERT INTO hero_stats (hero_id, games, wins) VALUES ($1, 1, $2) \
				 ON CONFLICT (hero_id) DO UPDATE SET \
					games = games + 1, \
					wins = wins + excluded.wins",
			)
			.bind(hero)
			.bind(*team_won as i64)
			.execute(&mut **tx)
			.await?;
		}
	}

	for &radiant in &record.radiant_heroes {
		for &dire in &record.dire_heroes {
			if radiant == dire {
				continue;
			}
			let (a, b) = canonical_pair(radiant, dire);
			// (radiant < dire) == radiant_win is true iff hero_a won
			let a_wins = ((radiant < dire) == record.radiant_win) as i64;
			sqlx::query(
				"INSERT INTO hero_matchups (hero_a, hero_b, games, wins_a) VALUES ($1, $2, 1, $3) \
				 ON CONFLICT (hero_a, hero_b) DO UPDATE SET \
					games = games + 1, \
					wins_a = wins_a + excluded.wins_a",
			)
			.bind(a)
			.bind(b)
			.bind(a_wins)
			.execute(&mut **tx)
			.await?;
		}
	}

	for (heroes, team_won) in &teams {
		let pairs: Vec<(i32, i32)> = heroes.iter().tuple_combinations().map(|(&x, &y)| (x, y)).collect();
		for (x, y) in pairs {
			let (a, b) = canonical_pair(x, y);
			sqlx::query(
				"INSERT INTO hero_synergy (hero_a, hero_b, games, wins) VALUES ($1, $2, 1, $3) \
				 ON CONFLICT (hero_a, hero_b) DO UPDATE SET \
					games = games + 1, \
					wins = wins + excluded.wins",
			)
			.bind(a)
			.bind(b)
			.bind(*team_won as i64)
			.execute(&mut **tx)
			.await?;
		}
	}
	Ok(())
}

/// Truncate the three aggregate tables and repopulate them from every
/// retained match that passes the duration filter. The per-match counting is
/// the in-memory mirror of `apply_aggregate_deltas`.
async fn rebuild_aggregates(
	tx: &mut sqlx::Transaction<'_, Any>,
	min_match_duration: i64,
) -> Result<(usize, usize, usize)> {
	sqlx::query("DELETE FROM hero_matchups").execute(&mut **tx).await?;
	sqlx::query("DELETE FROM hero_synergy").execute(&mut **tx).await?;
	sqlx::query("DELETE FROM hero_stats").execute(&mut **tx).await?;

	let sources = queries::rebuild_sources(&mut **tx, min_match_duration).await?;

	let mut stats = HeroCounts::new();
	let mut matchups = PairCounts::new();
	let mut synergy = PairCounts::new();
	for source in &sources {
		let (radiant_win, radiant, dire) = source.decode()?;
		accumulate_match(&mut stats, &mut matchups, &mut synergy, radiant_win, &radiant, &dire);
	}

	let mut stat_batch = Batch::new("hero_stats", "INSERT INTO hero_stats (hero_id, games, wins) VALUES ");
	for (hero, (games, wins)) in &stats {
		stat_batch.row(&[i64::from(*hero), *games, *wins])?;
	}
	let mut matchup_batch =
		Batch::new("hero_matchups", "INSERT INTO hero_matchups (hero_a, hero_b, games, wins_a) VALUES ");
	for ((a, b), (games, wins_a)) in &matchups {
		matchup_batch.row(&[i64::from(*a), i64::from(*b), *games, *wins_a])?;
	}
	let mut synergy_batch =
		Batch::new("hero_synergy", "INSERT INTO hero_synergy (hero_a, hero_b, games, wins) VALUES ");
	for ((a, b), (games, wins)) in &synergy {
		synergy_batch.row(&[i64::from(*a), i64::from(*b), *games, *wins])?;
	}

	let counts = (stat_batch.len(), matchup_batch.len(), synergy_batch.len());
	stat_batch.execute(&mut **tx).await?;
	matchup_batch.execute(&mut **tx).await?;
	synergy_batch.execute(&mut **tx).await?;
	Ok(counts)
}

fn accumulate_match(
	stats: &mut HeroCounts,
	matchups: &mut PairCounts,
	synergy: &mut PairCounts,
	radiant_win: bool,
	radiant: &[i32],
	dire: &[i32],
) {
	for (heroes, team_won) in &[(radiant, radiant_win), (dire, !radiant_win)] {
		for &hero in heroes.iter() {
			let entry = stats.entry(hero).or_insert((0, 0));
			entry.0 += 1;
			entry.1 += *team_won as i64;
		}
		for (&x, &y) in heroes.iter().tuple_combinations() {
			let entry = synergy.entry(canonical_pair(x, y)).or_insert((0, 0));
			entry.0 += 1;
			entry.1 += *team_won as i64;
		}
	}
	for &r in radiant {
		for &d in dire {
			if r == d {
				continue;
			}
			let entry = matchups.entry(canonical_pair(r, d)).or_insert((0, 0));
			entry.0 += 1;
			entry.1 += ((r < d) == radiant_win) as i64;
		}
	}
}

const DELETE_CHUNK: usize = 500;

async fn delete_by_match_ids(
	tx: &mut sqlx::Transaction<'_, Any>,
	table: &str,
	match_ids: &[i64],
) -> Result<u64> {
	let mut affected = 0;
	for chunk in match_ids.chunks(DELETE_CHUNK) {
		let mut sql = format!("DELETE FROM {} WHERE match_id IN (", table);
		for (i, id) in chunk.iter().enumerate() {
			if i > 0 {
				sql.push(',');
			}
			itoa::fmt(&mut sql, *id)?;
		}
		sql.push(')');
		affected += sqlx::query(sql.as_str()).execute(&mut **tx).await?.rows_affected();
	}
	Ok(affected)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::RankBucket;
	use tempfile::TempDir;

	async fn test_db(dir: &TempDir) -> Database {
		crate::initialize();
		let url = format!("sqlite://{}?mode=rwc", dir.path().join("archive.db").display());
		let config = DatabaseConfig {
			url,
			allowed_modes: [(22, 7)].iter().copied().collect(),
			min_match_duration: 900,
		};
		Database::setup(&config).await.unwrap()
	}

	fn record(match_id: i64, duration: Option<i64>, radiant_win: bool, start_time: i64) -> MatchRecord {
		MatchRecord {
			match_id,
			start_time,
			duration,
			patch: Some("57".to_string()),
			avg_rank_tier: Some(42),
			rank_bucket: RankBucket::High,
			game_mode: Some(22),
			lobby_type: Some(7),
			radiant_win,
			radiant_heroes: vec![1, 2, 3, 4, 5],
			dire_heroes: vec![6, 7, 8, 9, 10],
		}
	}

	fn players_of(record: &MatchRecord) -> Vec<MatchPlayerRow> {
		let mut players = Vec::new();
		for (i, &hero) in record.radiant_heroes.iter().enumerate() {
			players.push(MatchPlayerRow {
				hero_id: hero,
				player_slot: i as i32,
				is_radiant: true,
				kills: Some(5),
				items: [Some(1), None, None, None, None, None],
				..Default::default()
			});
		}
		for (i, &hero) in record.dire_heroes.iter().enumerate() {
			players.push(MatchPlayerRow {
				hero_id: hero,
				player_slot: 128 + i as i32,
				is_radiant: false,
				..Default::default()
			});
		}
		players
	}

	async fn all_matchup_pairs(db: &Database) -> Vec<MatchupPairRow> {
		sqlx::query_as("SELECT hero_a, hero_b, games, wins_a FROM hero_matchups ORDER BY hero_a, hero_b")
			.fetch_all(db.pool())
			.await
			.unwrap()
	}

	async fn all_synergy_pairs(db: &Database) -> Vec<SynergyPairRow> {
		sqlx::query_as("SELECT hero_a, hero_b, games, wins FROM hero_synergy ORDER BY hero_a, hero_b")
			.fetch_all(db.pool())
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn single_ranked_match_populates_all_aggregates() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let rec = record(1, Some(1800), true, 1_700_000_000);

		let outcome = db.save_match(&rec, &players_of(&rec)).await.unwrap();
		assert_eq!(outcome, SaveOutcome::Inserted);
		assert!(db.match_exists(1).await.unwrap());

		let mut conn = db.conn().await.unwrap();
		let (stats, matchups, synergy) = queries::aggregate_row_counts(&mut conn).await.unwrap();
		assert_eq!((stats, matchups, synergy), (10, 25, 20));

		for hero in 1..=5 {
			assert_eq!(db.total_games(hero).await.unwrap(), 1);
			assert_eq!(db.base_winrate(hero).await.unwrap(), Some(1.0));
		}
		for hero in 6..=10 {
			assert_eq!(db.total_games(hero).await.unwrap(), 1);
			assert_eq!(db.base_winrate(hero).await.unwrap(), Some(0.0));
		}

		let pairs = all_matchup_pairs(&db).await;
		let pair_1_6 = pairs.iter().find(|p| (p.hero_a, p.hero_b) == (1, 6)).unwrap();
		assert_eq!((pair_1_6.games, pair_1_6.wins_a), (1, 1));
		let pair_5_10 = pairs.iter().find(|p| (p.hero_a, p.hero_b) == (5, 10)).unwrap();
		assert_eq!((pair_5_10.games, pair_5_10.wins_a), (1, 1));

		let synergy_rows = db.synergy_rows(1, 1).await.unwrap();
		assert_eq!(synergy_rows.len(), 4);
		assert!(synergy_rows.iter().all(|s| s.wins == 1 && s.games == 1));
		let dire_synergy = db.synergy_rows(6, 1).await.unwrap();
		assert!(dire_synergy.iter().all(|s| s.wins == 0 && s.games == 1));
	}

	#[tokio::test]
	async fn pair_rows_are_canonically_ordered() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let rec = record(1, Some(1800), false, 1_700_000_000);
		db.save_match(&rec, &players_of(&rec)).await.unwrap();

		let misordered: (i64,) =
			sqlx::query_as("SELECT COUNT(*) FROM hero_matchups WHERE hero_a >= hero_b")
				.fetch_one(db.pool())
				.await
				.unwrap();
		assert_eq!(misordered.0, 0);
		let misordered: (i64,) =
			sqlx::query_as("SELECT COUNT(*) FROM hero_synergy WHERE hero_a >= hero_b")
				.fetch_one(db.pool())
				.await
				.unwrap();
		assert_eq!(misordered.0, 0);
	}

	#[tokio::test]
	async fn short_match_is_stored_without_aggregates() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let rec = record(1, Some(600), true, 1_700_000_000);

		let outcome = db.save_match(&rec, &players_of(&rec)).await.unwrap();
		assert_eq!(outcome, SaveOutcome::StoredWithoutAggregates);
		assert_eq!(db.matches_count().await.unwrap(), 1);

		let mut conn = db.conn().await.unwrap();
		assert_eq!(queries::aggregate_row_counts(&mut conn).await.unwrap(), (0, 0, 0));

		// players are raw data, not aggregates; they are still attached
		let players: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM match_players")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(players.0, 10);
	}

	#[tokio::test]
	async fn null_duration_still_aggregates() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let rec = record(1, None, true, 1_700_000_000);
		assert_eq!(db.save_match(&rec, &players_of(&rec)).await.unwrap(), SaveOutcome::Inserted);
	}

	#[tokio::test]
	async fn disallowed_mode_is_hard_blocked() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let mut rec = record(2, Some(1800), true, 1_700_000_000);
		rec.game_mode = Some(23); // turbo

		match db.save_match(&rec, &players_of(&rec)).await {
			Err(ArchiveError::GameModeHardBlocked { match_id: 2, .. }) => {}
			other => panic!("expected hard block, got {:?}", other),
		}
		assert_eq!(db.matches_count().await.unwrap(), 0);

		rec.game_mode = Some(22);
		rec.lobby_type = None;
		assert!(db.save_match(&rec, &players_of(&rec)).await.is_err());
		assert_eq!(db.matches_count().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn re_ingestion_is_a_no_op() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let rec = record(1, Some(1800), true, 1_700_000_000);
		let players = players_of(&rec);

		db.save_match(&rec, &players).await.unwrap();
		let before_matchups = all_matchup_pairs(&db).await;
		let before_synergy = all_synergy_pairs(&db).await;

		let outcome = db.save_match(&rec, &players).await.unwrap();
		assert_eq!(outcome, SaveOutcome::AlreadyKnown);

		assert_eq!(db.total_games(1).await.unwrap(), 1);
		let after_matchups = all_matchup_pairs(&db).await;
		let after_synergy = all_synergy_pairs(&db).await;
		assert_eq!(before_matchups.len(), after_matchups.len());
		assert_eq!(before_synergy.len(), after_synergy.len());
		for (before, after) in before_matchups.iter().zip(after_matchups.iter()) {
			assert_eq!((before.games, before.wins_a), (after.games, after.wins_a));
		}
		for (before, after) in before_synergy.iter().zip(after_synergy.iter()) {
			assert_eq!((before.games, before.wins), (after.games, after.wins));
		}
	}

	#[tokio::test]
	async fn eviction_rebuilds_from_the_survivors() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let now = 1_700_000_000i64;

		for (id, age_days) in &[(1i64, 100i64), (2, 10), (3, 1)] {
			let rec = record(*id, Some(1800), true, now - age_days * 86_400);
			db.save_match(&rec, &players_of(&rec)).await.unwrap();
		}
		assert_eq!(db.total_games(1).await.unwrap(), 3);

		let cutoff = now - 30 * 86_400;
		let old = db.match_ids_older_than(cutoff).await.unwrap();
		assert_eq!(old, vec![1]);

		db.evict_and_rebuild(&old).await.unwrap();
		assert_eq!(db.matches_count().await.unwrap(), 2);
		assert!(!db.match_exists(1).await.unwrap());
		assert_eq!(db.total_games(1).await.unwrap(), 2);

		let players: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM match_players")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(players.0, 20);
	}

	#[tokio::test]
	async fn rebuild_matches_incremental_state() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;

		// alternating winners plus one short match that must stay excluded
		for id in 1..=4i64 {
			let rec = record(id, Some(1800), id % 2 == 0, 1_700_000_000 + id);
			db.save_match(&rec, &players_of(&rec)).await.unwrap();
		}
		let short = record(5, Some(300), true, 1_700_000_100);
		db.save_match(&short, &players_of(&short)).await.unwrap();

		let incremental_matchups = all_matchup_pairs(&db).await;
		let incremental_synergy = all_synergy_pairs(&db).await;
		assert_eq!(db.total_games(1).await.unwrap(), 4);

		db.recalculate_all().await.unwrap();

		assert_eq!(db.total_games(1).await.unwrap(), 4);
		assert_eq!(db.base_winrate(1).await.unwrap(), Some(0.5));
		let rebuilt_matchups = all_matchup_pairs(&db).await;
		let rebuilt_synergy = all_synergy_pairs(&db).await;
		assert_eq!(incremental_matchups.len(), rebuilt_matchups.len());
		for (incremental, rebuilt) in incremental_matchups.iter().zip(rebuilt_matchups.iter()) {
			assert_eq!((incremental.hero_a, incremental.hero_b), (rebuilt.hero_a, rebuilt.hero_b));
			assert_eq!((incremental.games, incremental.wins_a), (rebuilt.games, rebuilt.wins_a));
		}
		assert_eq!(incremental_synergy.len(), rebuilt_synergy.len());
		for (incremental, rebuilt) in incremental_synergy.iter().zip(rebuilt_synergy.iter()) {
			assert_eq!((incremental.games, incremental.wins), (rebuilt.games, rebuilt.wins));
		}
	}

	#[tokio::test]
	async fn matchup_rows_resolve_the_queried_side() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;

		sqlx::query("INSERT INTO hero_stats (hero_id, games, wins) VALUES (7, 1000, 550)")
			.execute(db.pool())
			.await
			.unwrap();
		sqlx::query("INSERT INTO hero_matchups (hero_a, hero_b, games, wins_a) VALUES (3, 7, 200, 80)")
			.execute(db.pool())
			.await
			.unwrap();

		assert_eq!(db.base_winrate(7).await.unwrap(), Some(0.55));

		let rows = db.matchup_rows(7, 50).await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].hero_id, 3);
		assert_eq!(rows[0].games, 200);
		assert_eq!(rows[0].wins, 120);
		assert_eq!(rows[0].wr_vs, 0.6);

		// below the min_games floor nothing comes back
		assert!(db.matchup_rows(7, 201).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn opponent_cache_replace_is_atomic_per_hero() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;

		let old = vec![
			OpponentCacheRow { opponent_hero_id: 2, games: 10, wins: 5, winrate: 0.5, updated_at: 100 },
			OpponentCacheRow { opponent_hero_id: 3, games: 10, wins: 7, winrate: 0.7, updated_at: 100 },
		];
		db.replace_opponent_cache(1, &old).await.unwrap();
		// a different hero's rows must survive hero 1's refresh
		db.replace_opponent_cache(9, &old).await.unwrap();

		let new = vec![OpponentCacheRow {
			opponent_hero_id: 4,
			games: 20,
			wins: 11,
			winrate: 0.55,
			updated_at: 200,
		}];
		db.replace_opponent_cache(1, &new).await.unwrap();

		let rows = db.opponent_cache_rows(1).await.unwrap();
		assert_eq!(rows, new);
		assert_eq!(db.opponent_cache_rows(9).await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn cache_rows_come_back_sorted_by_winrate() {
		let dir = TempDir::new().unwrap();
		let db = test_db(&dir).await;
		let rows = vec![
			OpponentCacheRow { opponent_hero_id: 2, games: 10, wins: 3, winrate: 0.3, updated_at: 100 },
			OpponentCacheRow { opponent_hero_id: 3, games: 10, wins: 9, winrate: 0.9, updated_at: 100 },
			OpponentCacheRow { opponent_hero_id: 4, games: 10, wins: 6, winrate: 0.6, updated_at: 100 },
		];
		db.replace_opponent_cache(1, &rows).await.unwrap();
		let fetched = db.opponent_cache_rows(1).await.unwrap();
		let winrates: Vec<f64> = fetched.iter().map(|r| r.winrate).collect();
		assert_eq!(winrates, vec![0.9, 0.6, 0.3]);
	}
}
