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

//! Common SQL queries on the archive datastore abstracted into rust functions

use sqlx::any::AnyConnection;

use crate::{
	database::models::{
		round4, HeroPairStat, HeroStatRow, MatchupPairRow, OpponentCacheRow, RebuildSourceRow, SynergyPairRow,
	},
	error::Result,
};

/// Check if `match_id` is already stored. Primary-key probe, no join.
pub async fn match_exists(conn: &mut AnyConnection, match_id: i64) -> Result<bool> {
	let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM matches WHERE match_id = $1")
		.bind(match_id)
		.fetch_optional(&mut *conn)
		.await?;
	Ok(row.is_some())
}

/// All matchup rows touching `hero_id` with at least `min_games`, resolved to
/// the hero's point of view.
pub async fn matchup_rows(conn: &mut AnyConnection, hero_id: i32, min_games: i64) -> Result<Vec<HeroPairStat>> {
	let rows: Vec<MatchupPairRow> = sqlx::query_as(
		"SELECT hero_a, hero_b, games, wins_a FROM hero_matchups \
		 WHERE (hero_a = $1 OR hero_b = $2) AND games >= $3",
	)
	.bind(hero_id)
	.bind(hero_id)
	.bind(min_games)
	.fetch_all(&mut *conn)
	.await?;

	Ok(rows
		.into_iter()
		.map(|row| HeroPairStat::new(row.opponent_of(hero_id), row.games, row.wins_for(hero_id)))
		.collect())
}

/// All synergy rows touching `hero_id` with at least `min_games`. The win
/// count is shared by both heroes of a pair, so no side resolution is needed.
pub async fn synergy_rows(conn: &mut AnyConnection, hero_id: i32, min_games: i64) -> Result<Vec<HeroPairStat>> {
	let rows: Vec<SynergyPairRow> = sqlx::query_as(
		"SELECT hero_a, hero_b, games, wins FROM hero_synergy \
		 WHERE (hero_a = $1 OR hero_b = $2) AND games >= $3",
	)
	.bind(hero_id)
	.bind(hero_id)
	.bind(min_games)
	.fetch_all(&mut *conn)
	.await?;

	Ok(rows.into_iter().map(|row| HeroPairStat::new(row.ally_of(hero_id), row.games, row.wins)).collect())
}

pub async fn hero_stat(conn: &mut AnyConnection, hero_id: i32) -> Result<Option<HeroStatRow>> {
	sqlx::query_as("SELECT hero_id, games, wins FROM hero_stats WHERE hero_id = $1")
		.bind(hero_id)
		.fetch_optional(&mut *conn)
		.await
		.map_err(Into::into)
}

/// The hero's overall win rate across retained matches, or None with no games.
pub async fn base_winrate(conn: &mut AnyConnection, hero_id: i32) -> Result<Option<f64>> {
	Ok(hero_stat(&mut *conn, hero_id)
		.await?
		.filter(|stat| stat.games > 0)
		.map(|stat| round4(stat.wins as f64 / stat.games as f64)))
}

pub async fn total_games(conn: &mut AnyConnection, hero_id: i32) -> Result<i64> {
	Ok(hero_stat(&mut *conn, hero_id).await?.map(|stat| stat.games).unwrap_or(0))
}

pub async fn matches_count(conn: &mut AnyConnection) -> Result<i64> {
	let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matches").fetch_one(&mut *conn).await?;
	Ok(row.0)
}

/// Match IDs with `start_time` strictly before `cutoff`, oldest first.
pub async fn match_ids_older_than(conn: &mut AnyConnection, cutoff: i64) -> Result<Vec<i64>> {
	let rows: Vec<(i64,)> =
		sqlx::query_as("SELECT match_id FROM matches WHERE start_time < $1 ORDER BY start_time ASC")
			.bind(cutoff)
			.fetch_all(&mut *conn)
			.await?;
	Ok(rows.into_iter().map(|r| r.0).collect())
}

/// The `count` oldest match IDs by start time, for size-cap enforcement.
pub async fn oldest_match_ids(conn: &mut AnyConnection, count: i64) -> Result<Vec<i64>> {
	let rows: Vec<(i64,)> =
		sqlx::query_as("SELECT match_id FROM matches ORDER BY start_time ASC LIMIT $1")
			.bind(count)
			.fetch_all(&mut *conn)
			.await?;
	Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Every retained match that passes the duration filter, in the shape the
/// aggregate rebuild consumes.
pub async fn rebuild_sources(conn: &mut AnyConnection, min_match_duration: i64) -> Result<Vec<RebuildSourceRow>> {
	sqlx::query_as(
		"SELECT radiant_win, radiant_heroes, dire_heroes FROM matches \
		 WHERE duration IS NULL OR duration >= $1",
	)
	.bind(min_match_duration)
	.fetch_all(&mut *conn)
	.await
	.map_err(Into::into)
}

/// Cached opponent aggregates for one hero, best winrate first.
pub async fn opponent_cache_rows(conn: &mut AnyConnection, hero_id: i32) -> Result<Vec<OpponentCacheRow>> {
	sqlx::query_as(
		"SELECT opponent_hero_id, games, wins, winrate, updated_at FROM hero_matchups_cache \
		 WHERE hero_id = $1 ORDER BY winrate DESC",
	)
	.bind(hero_id)
	.fetch_all(&mut *conn)
	.await
	.map_err(Into::into)
}

/// Row counts of the three aggregate tables, for consistency checks and logs.
pub async fn aggregate_row_counts(conn: &mut AnyConnection) -> Result<(i64, i64, i64)> {
	let stats: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hero_stats").fetch_one(&mut *conn).await?;
	let matchups: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hero_matchups").fetch_one(&mut *conn).await?;
	let synergy: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hero_synergy").fetch_one(&mut *conn).await?;
	Ok((stats.0, matchups.0, synergy.0))
}
