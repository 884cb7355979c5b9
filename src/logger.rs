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

//! logging
//!
//! One root dispatcher owns the per-crate filtering: our own records pass
//! through untouched while dependency noise (sqlx statement logs, hyper
//! connection chatter) is capped at warn. Two sinks hang off it, a colored
//! terse console sink and a verbose file sink with source locations.

use std::{fs, io, path::PathBuf};

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

pub fn init(console: LevelFilter, file: LevelFilter) -> io::Result<()> {
	let log_path = log_file_path()?;

	fern::Dispatch::new()
		.level(LevelFilter::Warn)
		.level_for("dota_archive", LevelFilter::Trace)
		.level_for("updater", LevelFilter::Trace)
		.level_for("recalc", LevelFilter::Trace)
		.chain(console_sink(console))
		.chain(file_sink(file, log_path)?)
		.apply()
		.map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

fn console_sink(level: LevelFilter) -> fern::Dispatch {
	let palette = ColoredLevelConfig::new()
		.trace(Color::BrightBlack)
		.debug(Color::Cyan)
		.info(Color::Green)
		.warn(Color::Yellow)
		.error(Color::Red);

	fern::Dispatch::new()
		.level(level)
		.format(move |out, message, record| {
			out.finish(format_args!(
				"{} {:<5} [{}] {}",
				chrono::Local::now().format("%H:%M:%S"),
				palette.color(record.level()),
				record.target(),
				message
			))
		})
		.chain(std::io::stdout())
}

fn file_sink(level: LevelFilter, log_path: PathBuf) -> io::Result<fern::Dispatch> {
	Ok(fern::Dispatch::new()
		.level(level)
		.format(|out, message, record| {
			let location = match (record.file(), record.line()) {
				(Some(source), Some(line)) => format!(" at {}:{}", source, line),
				_ => String::new(),
			};
			out.finish(format_args!(
				"{} {:<5} {}: {}{}",
				chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
				record.level(),
				record.target(),
				message,
				location
			))
		})
		.chain(fern::log_file(log_path)?))
}

/// Log files go under the platform's local data directory, e.g.
/// `$XDG_DATA_HOME/dota_archive/updater.log` on Linux.
fn log_file_path() -> io::Result<PathBuf> {
	let base = dirs::BaseDirs::new()
		.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory for log files"))?;
	let dir = base.data_local_dir().join("dota_archive");
	fs::create_dir_all(&dir)?;
	Ok(dir.join("updater.log"))
}
