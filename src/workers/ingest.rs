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

//! The two polling loops that discover and ingest matches.
//!
//! The listing loop follows the provider's recent-match feed; the explorer
//! loop queries match IDs per allowed mode. From the detail fetch onward both
//! run the same pipeline, so duplicate IDs across loops are harmless:
//! `match_exists` skips anything committed, and `save_match` is idempotent
//! for the rest.

use std::time::Duration;

use tokio::time::Instant;

use super::{retention, Shutdown, WorkerContext};
use crate::{error::Result, parser::MatchParser};

/// Per-cycle skip and save counters, logged once per cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
	pub new: usize,
	pub existing: usize,
	pub incomplete: usize,
	pub mode_rejected: usize,
	pub failed: usize,
	/// Set when shutdown interrupted the cycle; the loop exits after logging.
	pub cancelled: bool,
}

impl CycleStats {
	fn log(&self, loop_name: &str) {
		log::info!(
			"[{}] cycle done: +{} new | {} existing | {} incomplete | {} mode-rejected | {} failed",
			loop_name,
			self.new,
			self.existing,
			self.incomplete,
			self.mode_rejected,
			self.failed,
		);
	}
}

enum IngestOutcome {
	Saved,
	Incomplete,
	ModeRejected,
	Failed,
	Cancelled,
}

pub(super) async fn listing_loop(ctx: WorkerContext, shutdown: Shutdown) {
	log::info!("listing loop started, cycle every {:?}", ctx.config.poll_interval);
	let parser = MatchParser::from_config(&ctx.config);
	let mut last_cleanup: Option<Instant> = None;

	loop {
		let cycle_started = Instant::now();

		if retention::cleanup_due(last_cleanup, ctx.config.cleanup_interval) {
			if let Err(e) = retention::run_cleanup(&ctx).await {
				log::error!("cleanup job failed: {}", e);
			}
			last_cleanup = Some(Instant::now());
		}

		match listing_cycle(&ctx, &shutdown, &parser).await {
			Ok(stats) => {
				stats.log("listing");
				if stats.cancelled {
					break;
				}
			}
			Err(e) => log::warn!("[listing] cycle failed: {}", e),
		}

		if !sleep_until_next(&shutdown, ctx.config.poll_interval, cycle_started.elapsed()).await {
			break;
		}
	}
	log::info!("listing loop stopped");
}

pub(super) async fn explorer_loop(ctx: WorkerContext, shutdown: Shutdown) {
	log::info!("explorer loop started, cycle every {:?}", ctx.config.explorer_interval);
	let parser = MatchParser::from_config(&ctx.config);

	loop {
		let cycle_started = Instant::now();

		match explorer_cycle(&ctx, &shutdown, &parser).await {
			Ok(stats) => {
				stats.log("explorer");
				if stats.cancelled {
					break;
				}
			}
			Err(e) => log::warn!("[explorer] cycle failed: {}", e),
		}

		if !sleep_until_next(&shutdown, ctx.config.explorer_interval, cycle_started.elapsed()).await {
			break;
		}
	}
	log::info!("explorer loop stopped");
}

async fn listing_cycle(ctx: &WorkerContext, shutdown: &Shutdown, parser: &MatchParser) -> Result<CycleStats> {
	let mut stats = CycleStats::default();
	if !acquire_or_cancel(ctx, shutdown).await {
		stats.cancelled = true;
		return Ok(stats);
	}

	let summaries = ctx.source.list_recent_matches(None).await?;
	log::info!("[listing] provider returned {} summaries", summaries.len());

	for summary in summaries.into_iter().take(ctx.config.max_matches_per_cycle) {
		if ctx.db.match_exists(summary.match_id).await? {
			stats.existing += 1;
			continue;
		}
		if !ctx.config.fetch_match_details {
			// without the detail endpoint there is no trustworthy hero data
			log::warn!("[listing] detail fetch disabled; hero data unavailable, skipping rest of cycle");
			break;
		}
		match ingest_one(ctx, shutdown, parser, summary.match_id, summary.avg_rank_tier).await {
			IngestOutcome::Saved => stats.new += 1,
			IngestOutcome::Incomplete => stats.incomplete += 1,
			IngestOutcome::ModeRejected => stats.mode_rejected += 1,
			IngestOutcome::Failed => stats.failed += 1,
			IngestOutcome::Cancelled => {
				stats.cancelled = true;
				break;
			}
		}
	}
	Ok(stats)
}

async fn explorer_cycle(ctx: &WorkerContext, shutdown: &Shutdown, parser: &MatchParser) -> Result<CycleStats> {
	let mut stats = CycleStats::default();

	// one query per allowed mode pair, merged and de-duplicated per cycle
	let mut ids = Vec::new();
	let mut seen = hashbrown::HashSet::new();
	for &(game_mode, lobby_type) in ctx.config.allowed_modes.iter() {
		if !acquire_or_cancel(ctx, shutdown).await {
			stats.cancelled = true;
			return Ok(stats);
		}
		match ctx.source.query_recent_match_ids(game_mode, lobby_type, 100).await {
			Ok(batch) => {
				for id in batch {
					if seen.insert(id) {
						ids.push(id);
					}
				}
			}
			Err(e) => log::warn!(
				"[explorer] query for mode ({}, {}) failed: {}",
				game_mode,
				lobby_type,
				e
			),
		}
	}
	log::info!("[explorer] {} candidate ids this cycle", ids.len());

	for id in ids {
		if ctx.db.match_exists(id).await? {
			stats.existing += 1;
			continue;
		}
		match ingest_one(ctx, shutdown, parser, id, None).await {
			IngestOutcome::Saved => stats.new += 1,
			IngestOutcome::Incomplete => stats.incomplete += 1,
			IngestOutcome::ModeRejected => stats.mode_rejected += 1,
			IngestOutcome::Failed => stats.failed += 1,
			IngestOutcome::Cancelled => {
				stats.cancelled = true;
				break;
			}
		}
	}
	Ok(stats)
}

/// Fetch, parse, filter and save one match. Shared by both loops; all
/// failures are absorbed here so a bad match never ends a cycle.
async fn ingest_one(
	ctx: &WorkerContext,
	shutdown: &Shutdown,
	parser: &MatchParser,
	match_id: i64,
	rank_hint: Option<i32>,
) -> IngestOutcome {
	if !acquire_or_cancel(ctx, shutdown).await {
		return IngestOutcome::Cancelled;
	}

	let detail = match ctx.source.fetch_match_detail(match_id).await {
		Ok(detail) => detail,
		Err(e) => {
			log::warn!("failed to fetch details for match {}: {}", match_id, e);
			return IngestOutcome::Failed;
		}
	};

	let mut parsed = match parser.parse(&detail) {
		Ok(parsed) => parsed,
		Err(reason) => {
			log::info!("match {} incomplete ({}): {}", match_id, reason.code(), reason);
			return IngestOutcome::Incomplete;
		}
	};

	let admitted = match (parsed.record.game_mode, parsed.record.lobby_type) {
		(Some(gm), Some(lt)) => ctx.config.allowed_modes.contains(&(gm, lt)),
		_ => false,
	};
	if !admitted {
		log::debug!(
			"match {} mode ({:?}, {:?}) not in the allow-list, skipping",
			match_id,
			parsed.record.game_mode,
			parsed.record.lobby_type
		);
		return IngestOutcome::ModeRejected;
	}

	parsed.apply_rank_hint(rank_hint);

	match ctx.db.save_match(&parsed.record, &parsed.players).await {
		Ok(outcome) => {
			log::debug!("match {} saved ({:?})", match_id, outcome);
			IngestOutcome::Saved
		}
		Err(e) => {
			log::error!("failed to save match {}: {}", match_id, e);
			IngestOutcome::Failed
		}
	}
}

/// Wait on the governor unless shutdown wins the race. Returns false on
/// shutdown; a cancelled wait leaves the governor untouched.
async fn acquire_or_cancel(ctx: &WorkerContext, shutdown: &Shutdown) -> bool {
	tokio::select! {
		_ = shutdown.recv() => false,
		_ = ctx.governor.acquire() => true,
	}
}

/// Sleep out the rest of the cycle interval. Returns false on shutdown.
async fn sleep_until_next(shutdown: &Shutdown, interval: Duration, elapsed: Duration) -> bool {
	let remaining = interval.saturating_sub(elapsed);
	log::debug!("sleeping {:?} until next cycle", remaining);
	tokio::select! {
		_ = shutdown.recv() => false,
		_ = tokio::time::sleep(remaining) => true,
	}
}
