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

//! One-off admin tool: rebuild every aggregate table from the stored
//! matches. No match rows are deleted. Exits 0 on success, 1 on failure.

use anyhow::Result;

use dota_archive::{logger, Config, Database, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<()> {
	let _ = dotenv::dotenv();
	logger::init(log::LevelFilter::Info, log::LevelFilter::Debug)?;

	let config = Config::from_env()?;
	log::info!("admin recalc: starting full aggregate recalculation");

	let db = Database::setup(&DatabaseConfig::from_config(&config)).await?;
	db.recalculate_all().await?;

	log::info!("admin recalc: finished successfully");
	Ok(())
}
