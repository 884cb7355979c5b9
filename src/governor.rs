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

//! Process-wide request budget for the upstream provider.
//!
//! Every code path that issues a provider call (both ingestion loops and the
//! opponent-cache refresh) shares one `RateGovernor`, so the combined call
//! rate never exceeds the configured ceiling over any 60-second window.

use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

pub struct RateGovernor {
	min_delay: Duration,
	last: Mutex<Option<Instant>>,
}

impl RateGovernor {
	pub fn new(max_per_minute: u32) -> Self {
		let per_minute = max_per_minute.max(1);
		Self {
			min_delay: Duration::from_secs_f64(60.0 / f64::from(per_minute)),
			last: Mutex::new(None),
		}
	}

	/// Sleep until at least `min_delay` has passed since the previous grant,
	/// then record this grant. The lock is held across the sleep, which
	/// serializes concurrent acquirers: each caller waits out its own gap.
	pub async fn acquire(&self) {
		let mut last = self.last.lock().await;
		if let Some(previous) = *last {
			let elapsed = previous.elapsed();
			if elapsed < self.min_delay {
				tokio::time::sleep(self.min_delay - elapsed).await;
			}
		}
		*last = Some(Instant::now());
	}
}
