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

//! The single schema-creation path for the datastore.
//!
//! All DDL lives here; nothing else in the crate creates tables. Apart from
//! auto-increment primary keys the statements are identical on SQLite and
//! PostgreSQL, so the dialect fork is confined to one helper.

use sqlx::{any::AnyConnection, Connection};

use crate::error::{ArchiveError, Result};

pub(crate) const SCHEMA_VERSION: i64 = 1;

/// Create any missing tables and indexes, then record or check the schema
/// version. Safe to run repeatedly.
pub async fn migrate(url: &str) -> Result<()> {
	let sqlite = is_sqlite(url);
	let mut conn = AnyConnection::connect(url).await?;

	if sqlite {
		// concurrent reads while the updater writes; WAL is sticky per file
		sqlx::query("PRAGMA journal_mode=WAL").execute(&mut conn).await?;
		sqlx::query("PRAGMA synchronous=NORMAL").execute(&mut conn).await?;
	}

	for statement in schema_statements(sqlite) {
		sqlx::query(&statement).execute(&mut conn).await?;
	}

	match version(&mut conn).await? {
		None => {
			sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
				.bind(SCHEMA_VERSION)
				.execute(&mut conn)
				.await?;
		}
		Some(found) if found == SCHEMA_VERSION => {}
		found => return Err(ArchiveError::SchemaVersion { found, expected: SCHEMA_VERSION }),
	}
	log::debug!("datastore schema ready (version {})", SCHEMA_VERSION);
	Ok(())
}

/// The stored schema version, if the datastore has been migrated at all.
pub(crate) async fn version(conn: &mut AnyConnection) -> Result<Option<i64>> {
	let row: Option<(i64,)> =
		sqlx::query_as("SELECT version FROM schema_version").fetch_optional(&mut *conn).await?;
	Ok(row.map(|r| r.0))
}

pub(crate) fn is_sqlite(url: &str) -> bool {
	url.starts_with("sqlite:")
}

/// An auto-increment integer primary key column in the engine's dialect.
fn autoinc(sqlite: bool) -> &'static str {
	if sqlite {
		"id INTEGER PRIMARY KEY AUTOINCREMENT"
	} else {
		"id BIGSERIAL PRIMARY KEY"
	}
}

fn schema_statements(sqlite: bool) -> Vec<String> {
	vec![
		"CREATE TABLE IF NOT EXISTS schema_version ( \
			version BIGINT NOT NULL \
		)"
		.to_string(),
		"CREATE TABLE IF NOT EXISTS matches ( \
			match_id BIGINT PRIMARY KEY, \
			start_time BIGINT NOT NULL, \
			duration BIGINT, \
			patch VARCHAR(16), \
			avg_rank_tier INTEGER, \
			rank_bucket VARCHAR(16) NOT NULL, \
			game_mode INTEGER NOT NULL, \
			lobby_type INTEGER NOT NULL, \
			radiant_win INTEGER NOT NULL, \
			radiant_heroes TEXT NOT NULL, \
			dire_heroes TEXT NOT NULL \
		)"
		.to_string(),
		format!(
			"CREATE TABLE IF NOT EXISTS match_players ( \
				{}, \
				match_id BIGINT NOT NULL, \
				player_slot INTEGER NOT NULL, \
				hero_id INTEGER NOT NULL, \
				is_radiant INTEGER NOT NULL, \
				lane INTEGER, \
				lane_role INTEGER, \
				gold_per_min INTEGER, \
				xp_per_min INTEGER, \
				kills INTEGER, \
				deaths INTEGER, \
				assists INTEGER, \
				hero_damage BIGINT, \
				tower_damage BIGINT, \
				obs_placed INTEGER, \
				sen_placed INTEGER, \
				last_hits INTEGER, \
				denies INTEGER, \
				hero_healing BIGINT, \
				net_worth BIGINT, \
				item0 BIGINT, \
				item1 BIGINT, \
				item2 BIGINT, \
				item3 BIGINT, \
				item4 BIGINT, \
				item5 BIGINT, \
				CONSTRAINT uq_match_players_slot UNIQUE (match_id, player_slot) \
			)",
			autoinc(sqlite)
		),
		"CREATE INDEX IF NOT EXISTS idx_match_players_match_id ON match_players (match_id)".to_string(),
		"CREATE TABLE IF NOT EXISTS hero_stats ( \
			hero_id INTEGER PRIMARY KEY, \
			games BIGINT NOT NULL DEFAULT 0, \
			wins BIGINT NOT NULL DEFAULT 0 \
		)"
		.to_string(),
		"CREATE TABLE IF NOT EXISTS hero_matchups ( \
			hero_a INTEGER NOT NULL, \
			hero_b INTEGER NOT NULL, \
			games BIGINT NOT NULL DEFAULT 0, \
			wins_a BIGINT NOT NULL DEFAULT 0, \
			PRIMARY KEY (hero_a, hero_b) \
		)"
		.to_string(),
		// hero_a is covered by the composite primary key; the OR-query in
		// matchup_rows needs hero_b indexed as well
		"CREATE INDEX IF NOT EXISTS idx_hero_matchups_hero_b ON hero_matchups (hero_b)".to_string(),
		"CREATE TABLE IF NOT EXISTS hero_synergy ( \
			hero_a INTEGER NOT NULL, \
			hero_b INTEGER NOT NULL, \
			games BIGINT NOT NULL DEFAULT 0, \
			wins BIGINT NOT NULL DEFAULT 0, \
			PRIMARY KEY (hero_a, hero_b) \
		)"
		.to_string(),
		format!(
			"CREATE TABLE IF NOT EXISTS hero_matchups_cache ( \
				{}, \
				hero_id INTEGER NOT NULL, \
				opponent_hero_id INTEGER NOT NULL, \
				games BIGINT NOT NULL, \
				wins BIGINT NOT NULL, \
				winrate DOUBLE PRECISION NOT NULL, \
				updated_at BIGINT NOT NULL, \
				CONSTRAINT uq_hero_matchups_cache_pair UNIQUE (hero_id, opponent_hero_id) \
			)",
			autoinc(sqlite)
		),
		"CREATE INDEX IF NOT EXISTS idx_hero_matchups_cache_hero_id ON hero_matchups_cache (hero_id)"
			.to_string(),
		"CREATE TABLE IF NOT EXISTS tokens ( \
			token VARCHAR(128) PRIMARY KEY, \
			user_id BIGINT NOT NULL, \
			expires_at BIGINT NOT NULL \
		)"
		.to_string(),
		"CREATE INDEX IF NOT EXISTS idx_tokens_user_id ON tokens (user_id)".to_string(),
		// owned by the external HTTP layer; created here so one migration
		// path covers the whole datastore
		"CREATE TABLE IF NOT EXISTS user_profiles ( \
			user_id BIGINT PRIMARY KEY, \
			favorite_heroes TEXT NOT NULL, \
			settings TEXT NOT NULL \
		)"
		.to_string(),
		format!(
			"CREATE TABLE IF NOT EXISTS quiz_results ( \
				{}, \
				user_id BIGINT NOT NULL, \
				result TEXT NOT NULL, \
				updated_at BIGINT \
			)",
			autoinc(sqlite)
		),
		"CREATE INDEX IF NOT EXISTS idx_quiz_results_user_id ON quiz_results (user_id)".to_string(),
		format!(
			"CREATE TABLE IF NOT EXISTS feedback ( \
				{}, \
				user_id BIGINT, \
				rating INTEGER, \
				tags TEXT, \
				message TEXT NOT NULL, \
				source VARCHAR(32) NOT NULL, \
				created_at BIGINT \
			)",
			autoinc(sqlite)
		),
		"CREATE INDEX IF NOT EXISTS idx_feedback_user_id ON feedback (user_id)".to_string(),
	]
}
