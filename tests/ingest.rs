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

//! End-to-end ingestion: a scripted provider feeds the worker system and the
//! datastore is inspected through the public read API.

use std::{
	collections::{HashMap, HashSet},
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use async_trait::async_trait;
use tempfile::TempDir;

use dota_archive::{
	provider::{MatchDetail, MatchSummary, MatchupEntry, PlayerDetail},
	ArchiveError, Config, Database, DatabaseConfig, MatchSource, Result, System, WorkerContext,
};

struct ScriptedSource {
	summaries: Vec<MatchSummary>,
	details: HashMap<i64, MatchDetail>,
	list_calls: AtomicUsize,
	query_calls: AtomicUsize,
}

impl ScriptedSource {
	fn new(summaries: Vec<MatchSummary>, details: Vec<MatchDetail>) -> Self {
		Self {
			summaries,
			details: details.into_iter().map(|d| (d.match_id, d)).collect(),
			list_calls: AtomicUsize::new(0),
			query_calls: AtomicUsize::new(0),
		}
	}
}

#[async_trait]
impl MatchSource for ScriptedSource {
	async fn list_recent_matches(&self, _less_than_id: Option<i64>) -> Result<Vec<MatchSummary>> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.summaries.clone())
	}

	async fn query_recent_match_ids(&self, game_mode: i32, lobby_type: i32, _limit: u32) -> Result<Vec<i64>> {
		self.query_calls.fetch_add(1, Ordering::SeqCst);
		let mut ids: Vec<i64> = self
			.details
			.values()
			.filter(|d| d.game_mode == Some(game_mode) && d.lobby_type == Some(lobby_type))
			.map(|d| d.match_id)
			.collect();
		ids.sort_unstable();
		Ok(ids)
	}

	async fn fetch_match_detail(&self, match_id: i64) -> Result<MatchDetail> {
		self.details.get(&match_id).cloned().ok_or(ArchiveError::ProviderHttp(404))
	}

	async fn fetch_hero_opponent_aggregates(&self, _hero_id: i32) -> Result<Vec<MatchupEntry>> {
		Ok(Vec::new())
	}
}

fn summary(match_id: i64) -> MatchSummary {
	MatchSummary {
		match_id,
		start_time: Some(1_700_000_000),
		duration: Some(1800),
		radiant_win: Some(true),
		avg_rank_tier: Some(45),
	}
}

fn player(hero_id: i32, slot: i32) -> PlayerDetail {
	PlayerDetail { hero_id: Some(hero_id), player_slot: Some(slot), ..Default::default() }
}

fn detail(match_id: i64, game_mode: i32, duration: i64, radiant_win: bool) -> MatchDetail {
	let mut players = Vec::new();
	for (i, hero) in [1, 2, 3, 4, 5].iter().enumerate() {
		players.push(player(*hero, i as i32));
	}
	for (i, hero) in [6, 7, 8, 9, 10].iter().enumerate() {
		players.push(player(*hero, 128 + i as i32));
	}
	MatchDetail {
		match_id,
		start_time: Some(1_700_000_000),
		duration: Some(duration),
		patch: Some(57),
		avg_rank_tier: None,
		game_mode: Some(game_mode),
		lobby_type: Some(7),
		radiant_win: Some(radiant_win),
		players,
	}
}

fn test_config(url: String) -> Config {
	Config {
		database_url: url,
		provider_url: "http://localhost".to_string(),
		api_key: None,
		poll_interval: Duration::from_millis(200),
		max_requests_per_minute: 60_000,
		max_matches: 300_000,
		days_to_keep: 90,
		cleanup_interval: Duration::from_secs(86_400),
		max_matches_per_cycle: 50,
		fetch_match_details: true,
		use_explorer: false,
		explorer_interval: Duration::from_millis(200),
		allowed_modes: {
			let mut modes = HashSet::new();
			modes.insert((22, 7));
			modes
		},
		min_match_duration: 900,
		cache_ttl: Duration::from_secs(86_400),
		extra_junk_items: Vec::new(),
	}
}

fn db_url(dir: &TempDir) -> String {
	format!("sqlite://{}?mode=rwc", dir.path().join("ingest.db").display())
}

const WAIT_BUDGET: Duration = Duration::from_secs(20);
const WAIT_STEP: Duration = Duration::from_millis(25);

async fn wait_for_match(db: &Database, match_id: i64) {
	tokio::time::timeout(WAIT_BUDGET, async {
		while !db.match_exists(match_id).await.unwrap() {
			tokio::time::sleep(WAIT_STEP).await;
		}
	})
	.await
	.expect("match was not ingested in time");
}

#[tokio::test]
async fn listing_loop_ingests_filters_and_stays_idempotent() {
	let dir = TempDir::new().unwrap();
	let config = test_config(db_url(&dir));
	let db = Database::setup(&DatabaseConfig::from_config(&config)).await.unwrap();

	// 101 is a valid ranked match, 102 is turbo, 103 is short, 104 has no
	// detail payload at all
	let source = Arc::new(ScriptedSource::new(
		vec![summary(101), summary(102), summary(103), summary(104)],
		vec![detail(101, 22, 1800, true), detail(102, 23, 1800, true), detail(103, 22, 600, true)],
	));

	let system = System::spawn(WorkerContext::new(config, db.clone(), source.clone()));

	wait_for_match(&db, 101).await;

	// let a second listing cycle complete to exercise the existing-skip path
	let calls_before = source.list_calls.load(Ordering::SeqCst);
	tokio::time::timeout(WAIT_BUDGET, async {
		while source.list_calls.load(Ordering::SeqCst) <= calls_before + 1 {
			tokio::time::sleep(WAIT_STEP).await;
		}
	})
	.await
	.expect("second listing cycle did not run");

	system.shutdown().await.unwrap();

	// the ranked match landed with its aggregates
	assert!(db.match_exists(101).await.unwrap());
	assert_eq!(db.total_games(1).await.unwrap(), 1);
	assert_eq!(db.base_winrate(1).await.unwrap(), Some(1.0));
	let rows = db.matchup_rows(1, 1).await.unwrap();
	assert_eq!(rows.len(), 5);
	assert!(rows.iter().all(|r| r.games == 1 && r.wins == 1));

	// the listing hint substituted the missing detail tier
	let bucket: (String,) = sqlx::query_as("SELECT rank_bucket FROM matches WHERE match_id = 101")
		.fetch_one(db.pool())
		.await
		.unwrap();
	assert_eq!(bucket.0, "high");

	// turbo was filtered before the store, the short match skipped aggregates
	assert!(!db.match_exists(102).await.unwrap());
	assert!(db.match_exists(103).await.unwrap());
	assert_eq!(db.matches_count().await.unwrap(), 2);
	assert_eq!(db.total_games(1).await.unwrap(), 1);

	// re-listing the same matches across cycles changed nothing
	let stats: (i64,) =
		sqlx::query_as("SELECT COUNT(*) FROM hero_stats").fetch_one(db.pool()).await.unwrap();
	let matchups: (i64,) =
		sqlx::query_as("SELECT COUNT(*) FROM hero_matchups").fetch_one(db.pool()).await.unwrap();
	let synergy: (i64,) =
		sqlx::query_as("SELECT COUNT(*) FROM hero_synergy").fetch_one(db.pool()).await.unwrap();
	assert_eq!((stats.0, matchups.0, synergy.0), (10, 25, 20));
}

#[tokio::test]
async fn explorer_loop_feeds_the_same_pipeline() {
	let dir = TempDir::new().unwrap();
	let mut config = test_config(db_url(&dir));
	config.use_explorer = true;
	// park the listing loop so only the explorer ingests
	config.poll_interval = Duration::from_secs(3600);
	let db = Database::setup(&DatabaseConfig::from_config(&config)).await.unwrap();

	let source = Arc::new(ScriptedSource::new(
		Vec::new(),
		vec![detail(201, 22, 2000, false), detail(202, 23, 2000, false)],
	));

	let system = System::spawn(WorkerContext::new(config, db.clone(), source.clone()));

	wait_for_match(&db, 201).await;
	system.shutdown().await.unwrap();

	assert!(source.query_calls.load(Ordering::SeqCst) >= 1);
	// 202 is turbo; the explorer query for (22, 7) never returned it
	assert!(!db.match_exists(202).await.unwrap());
	assert_eq!(db.total_games(6).await.unwrap(), 1);
	assert_eq!(db.base_winrate(6).await.unwrap(), Some(1.0));
}

#[tokio::test]
async fn shutdown_interrupts_idle_loops_promptly() {
	let dir = TempDir::new().unwrap();
	let mut config = test_config(db_url(&dir));
	config.poll_interval = Duration::from_secs(3600);
	config.use_explorer = true;
	config.explorer_interval = Duration::from_secs(3600);
	let db = Database::setup(&DatabaseConfig::from_config(&config)).await.unwrap();

	let source = Arc::new(ScriptedSource::new(Vec::new(), Vec::new()));
	let system = System::spawn(WorkerContext::new(config, db, source));

	// give the loops a moment to reach their sleeps
	tokio::time::sleep(Duration::from_millis(300)).await;

	tokio::time::timeout(Duration::from_secs(5), system.shutdown())
		.await
		.expect("shutdown should not wait out the poll interval")
		.unwrap();
}
