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

//! The ingestion worker daemon. Runs the polling loops until interrupted.

use std::sync::Arc;

use anyhow::Result;

use dota_archive::{logger, Config, Database, DatabaseConfig, ProviderClient, System, WorkerContext};

#[tokio::main]
async fn main() -> Result<()> {
	// best-effort; a missing .env is not an error
	let _ = dotenv::dotenv();
	logger::init(log::LevelFilter::Info, log::LevelFilter::Debug)?;

	let config = Config::from_env()?;
	log::info!("============================================================");
	log::info!("stats updater starting");
	config.log_summary();
	log::info!("============================================================");

	let db = Database::setup(&DatabaseConfig::from_config(&config)).await?;
	log::info!("datastore ready, current match count: {}", db.matches_count().await?);

	let provider = Arc::new(ProviderClient::from_config(&config)?);
	let system = System::spawn(WorkerContext::new(config, db, provider));

	tokio::signal::ctrl_c().await?;
	log::info!("shutdown signal received, stopping workers");
	system.shutdown().await?;
	Ok(())
}
