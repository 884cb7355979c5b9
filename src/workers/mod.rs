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

//! The long-lived ingestion tasks and their lifecycle.
//!
//! `System::spawn` starts the listing loop (which also hosts the retention
//! trigger) and, when configured, the explorer loop. Both observe one
//! cancellation signal: dropping the kill sender wakes every loop out of its
//! sleeps and governor waits, while an in-flight save always commits or
//! aborts cleanly before the task exits.

mod ingest;
mod retention;

pub use self::ingest::CycleStats;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
	config::Config,
	database::Database,
	error::{ArchiveError, Result},
	governor::RateGovernor,
	provider::MatchSource,
};

/// Everything a worker task needs a handle to.
#[derive(Clone)]
pub struct WorkerContext {
	pub config: Arc<Config>,
	pub db: Database,
	pub source: Arc<dyn MatchSource>,
	pub governor: Arc<RateGovernor>,
}

impl WorkerContext {
	pub fn new(config: Config, db: Database, source: Arc<dyn MatchSource>) -> Self {
		let governor = Arc::new(RateGovernor::new(config.max_requests_per_minute));
		Self { config: Arc::new(config), db, source, governor }
	}
}

/// Cancellation signal cloned into every loop. Resolves once the system
/// starts shutting down, whether or not this receiver got the message.
#[derive(Clone)]
pub struct Shutdown(flume::Receiver<()>);

impl Shutdown {
	pub async fn recv(&self) {
		// a message and a disconnect both mean: stop
		let _ = self.0.recv_async().await;
	}
}

/// Control the execution of the ingestion engine.
pub struct System {
	kill_tx: flume::Sender<()>,
	handles: Vec<JoinHandle<()>>,
}

impl System {
	/// Spawn the listing loop and, if enabled, the explorer loop.
	pub fn spawn(ctx: WorkerContext) -> Self {
		let (kill_tx, kill_rx) = flume::bounded(1);
		let shutdown = Shutdown(kill_rx);

		let mut handles = Vec::new();
		{
			let ctx = ctx.clone();
			let shutdown = shutdown.clone();
			handles.push(tokio::spawn(async move { ingest::listing_loop(ctx, shutdown).await }));
		}
		if ctx.config.use_explorer {
			let shutdown = shutdown.clone();
			handles.push(tokio::spawn(async move { ingest::explorer_loop(ctx, shutdown).await }));
		}

		Self { kill_tx, handles }
	}

	/// Stop every loop and wait for them to wind down.
	pub async fn shutdown(self) -> Result<()> {
		drop(self.kill_tx);
		for joined in futures::future::join_all(self.handles).await {
			joined.map_err(|e| ArchiveError::Shutdown(e.to_string()))?;
		}
		Ok(())
	}
}
