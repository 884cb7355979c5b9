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

//! Typed client for the upstream match-data provider.
//!
//! Four endpoints are consumed: the recent-match listing, the SQL-style
//! explorer, full match detail, and per-hero opponent aggregates. The
//! listing's team-composition fields are untrusted upstream and are not even
//! deserialized here; `fetch_match_detail` is the only source of truth for
//! teams and heroes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
	config::Config,
	error::{ArchiveError, Result},
};

/// Deadline for the listing, explorer and detail endpoints.
const HEAVY_CALL_DEADLINE: Duration = Duration::from_secs(30);
/// Deadline for the cheap per-hero aggregate endpoint.
const LIGHT_CALL_DEADLINE: Duration = Duration::from_secs(15);

/// One entry of the recent-match listing. Carries hints only; the team
/// columns returned by the endpoint are empirically zeroed and ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct MatchSummary {
	pub match_id: i64,
	#[serde(default)]
	pub start_time: Option<i64>,
	#[serde(default)]
	pub duration: Option<i64>,
	#[serde(default)]
	pub radiant_win: Option<bool>,
	#[serde(default)]
	pub avg_rank_tier: Option<i32>,
}

/// Full match record as served by the detail endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct MatchDetail {
	pub match_id: i64,
	#[serde(default)]
	pub start_time: Option<i64>,
	#[serde(default)]
	pub duration: Option<i64>,
	#[serde(default)]
	pub patch: Option<i64>,
	#[serde(default)]
	pub avg_rank_tier: Option<i32>,
	#[serde(default)]
	pub game_mode: Option<i32>,
	#[serde(default)]
	pub lobby_type: Option<i32>,
	#[serde(default)]
	pub radiant_win: Option<bool>,
	#[serde(default)]
	pub players: Vec<PlayerDetail>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlayerDetail {
	#[serde(default)]
	pub hero_id: Option<i32>,
	#[serde(default)]
	pub player_slot: Option<i32>,
	#[serde(default)]
	pub lane: Option<i32>,
	#[serde(default)]
	pub lane_role: Option<i32>,
	#[serde(default)]
	pub gold_per_min: Option<i32>,
	#[serde(default)]
	pub xp_per_min: Option<i32>,
	#[serde(default)]
	pub kills: Option<i32>,
	#[serde(default)]
	pub deaths: Option<i32>,
	#[serde(default)]
	pub assists: Option<i32>,
	#[serde(default)]
	pub hero_damage: Option<i64>,
	#[serde(default)]
	pub tower_damage: Option<i64>,
	#[serde(default)]
	pub obs_placed: Option<i32>,
	#[serde(default)]
	pub sen_placed: Option<i32>,
	#[serde(default)]
	pub last_hits: Option<i32>,
	#[serde(default)]
	pub denies: Option<i32>,
	#[serde(default)]
	pub hero_healing: Option<i64>,
	#[serde(default)]
	pub net_worth: Option<i64>,
	#[serde(default)]
	pub item_0: Option<i64>,
	#[serde(default)]
	pub item_1: Option<i64>,
	#[serde(default)]
	pub item_2: Option<i64>,
	#[serde(default)]
	pub item_3: Option<i64>,
	#[serde(default)]
	pub item_4: Option<i64>,
	#[serde(default)]
	pub item_5: Option<i64>,
}

/// One opponent row of the per-hero aggregate endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct MatchupEntry {
	#[serde(default)]
	pub hero_id: Option<i32>,
	#[serde(default)]
	pub games_played: i64,
	#[serde(default)]
	pub wins: i64,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
	#[serde(default)]
	rows: Vec<ExplorerRow>,
}

#[derive(Debug, Deserialize)]
struct ExplorerRow {
	#[serde(default)]
	match_id: Option<i64>,
}

/// The provider operations the rest of the crate depends on. Kept as a trait
/// so the ingestion pipeline and the opponent cache can run against an
/// in-process source in tests.
#[async_trait]
pub trait MatchSource: Send + Sync {
	/// Up to 100 recent match summaries, newest first. `less_than_id` pages
	/// backwards through match history.
	async fn list_recent_matches(&self, less_than_id: Option<i64>) -> Result<Vec<MatchSummary>>;

	/// Up to `limit` recent match IDs for one `(game_mode, lobby_type)` pair,
	/// newest first.
	async fn query_recent_match_ids(&self, game_mode: i32, lobby_type: i32, limit: u32) -> Result<Vec<i64>>;

	async fn fetch_match_detail(&self, match_id: i64) -> Result<MatchDetail>;

	async fn fetch_hero_opponent_aggregates(&self, hero_id: i32) -> Result<Vec<MatchupEntry>>;
}

pub struct ProviderClient {
	http: reqwest::Client,
	base_url: String,
	api_key: Option<String>,
}

impl ProviderClient {
	pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		let http = reqwest::Client::builder().build()?;
		Ok(Self { http, base_url, api_key })
	}

	pub fn from_config(config: &Config) -> Result<Self> {
		Self::new(config.provider_url.clone(), config.api_key.clone())
	}

	async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		query: &[(&str, String)],
		deadline: Duration,
	) -> Result<T> {
		let url = format!("{}{}", self.base_url, path);
		let mut request = self.http.get(&url).timeout(deadline);
		if !query.is_empty() {
			request = request.query(query);
		}
		if let Some(key) = &self.api_key {
			request = request.query(&[("api_key", key.as_str())]);
		}

		let response = request.send().await?;
		let status = response.status();
		if !status.is_success() {
			let head: String = response.text().await.unwrap_or_default().chars().take(200).collect();
			log::error!("provider {} returned HTTP {}: {}", path, status.as_u16(), head);
			return Err(ArchiveError::ProviderHttp(status.as_u16()));
		}
		Ok(response.json().await?)
	}
}

#[async_trait]
impl MatchSource for ProviderClient {
	async fn list_recent_matches(&self, less_than_id: Option<i64>) -> Result<Vec<MatchSummary>> {
		let mut query = vec![("significant", "1".to_string()), ("mmr_descending", "1".to_string())];
		if let Some(id) = less_than_id {
			query.push(("less_than_match_id", id.to_string()));
		}
		self.get_json("/publicMatches", &query, HEAVY_CALL_DEADLINE).await
	}

	async fn query_recent_match_ids(&self, game_mode: i32, lobby_type: i32, limit: u32) -> Result<Vec<i64>> {
		let sql = format!(
			"SELECT match_id FROM public_matches \
			 WHERE game_mode = {} AND lobby_type = {} \
			 ORDER BY start_time DESC \
			 LIMIT {}",
			game_mode, lobby_type, limit
		);
		let response: ExplorerResponse =
			self.get_json("/explorer", &[("sql", sql)], HEAVY_CALL_DEADLINE).await?;
		Ok(response.rows.into_iter().filter_map(|row| row.match_id).collect())
	}

	async fn fetch_match_detail(&self, match_id: i64) -> Result<MatchDetail> {
		self.get_json(&format!("/matches/{}", match_id), &[], HEAVY_CALL_DEADLINE).await
	}

	async fn fetch_hero_opponent_aggregates(&self, hero_id: i32) -> Result<Vec<MatchupEntry>> {
		self.get_json(&format!("/heroes/{}/matchups", hero_id), &[], LIGHT_CALL_DEADLINE).await
	}
}
