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

//! Periodic eviction of old matches, by age and by size cap.
//!
//! Runs inside the listing loop's tick so it shares the main cadence. Each
//! phase that finds work triggers a full aggregate rebuild; when the age
//! phase already brings the table under the cap, the size phase does nothing.

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use super::WorkerContext;
use crate::error::Result;

pub(super) fn cleanup_due(last_run: Option<Instant>, interval: Duration) -> bool {
	match last_run {
		None => true,
		Some(at) => at.elapsed() >= interval,
	}
}

pub(super) async fn run_cleanup(ctx: &WorkerContext) -> Result<()> {
	log::info!("[cleanup] starting cleanup job");
	let days_to_keep = ctx.config.days_to_keep;
	let cutoff = Utc::now().timestamp() - i64::from(days_to_keep) * 86_400;

	let old_ids = ctx.db.match_ids_older_than(cutoff).await?;
	if old_ids.is_empty() {
		log::info!("[cleanup] no matches older than {} days", days_to_keep);
	} else {
		log::info!("[cleanup] deleting {} matches older than {} days", old_ids.len(), days_to_keep);
		ctx.db.evict_and_rebuild(&old_ids).await?;
	}

	let count = ctx.db.matches_count().await?;
	let cap = ctx.config.max_matches as i64;
	if count > cap {
		let excess = count - cap;
		log::info!("[cleanup] {} matches stored (cap {}), trimming {} oldest", count, cap, excess);
		let excess_ids = ctx.db.oldest_match_ids(excess).await?;
		ctx.db.evict_and_rebuild(&excess_ids).await?;
	} else {
		log::info!("[cleanup] match count ok: {} / {}", count, cap);
	}

	log::info!("[cleanup] finished, current count: {}", ctx.db.matches_count().await?);
	Ok(())
}
