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

use std::io;

use thiserror::Error;

use crate::parser::ParseReject;

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

/// Dota Archive Error Enum
#[derive(Debug, Error)]
pub enum ArchiveError {
	// Rust std io error
	#[error(transparent)]
	Io(#[from] io::Error),

	// upstream provider errors; transient, never fatal to a worker
	#[error("provider transport error: {0}")]
	ProviderNetwork(#[from] reqwest::Error),
	#[error("provider returned HTTP {0}")]
	ProviderHttp(u16),

	// encoding error
	#[error(transparent)]
	Serialization(#[from] serde_json::Error),
	#[error(transparent)]
	Fmt(#[from] std::fmt::Error),

	// database error
	#[error("sqlx error: {0}")]
	Sql(#[from] sqlx::Error),
	#[error("datastore schema version {found:?} does not match expected {expected}")]
	SchemaVersion { found: Option<i64>, expected: i64 },

	// deterministic bad upstream data; the match is skipped
	#[error("match {match_id} rejected: {reason}")]
	ParseRejected { match_id: i64, reason: ParseReject },

	// a disallowed (game_mode, lobby_type) reached the store despite the
	// pipeline filter; the write is refused
	#[error("match {match_id} with mode ({game_mode:?}, {lobby_type:?}) blocked by the store")]
	GameModeHardBlocked { match_id: i64, game_mode: Option<i32>, lobby_type: Option<i32> },

	#[error("invalid configuration: {0}")]
	Config(String),

	// channel error
	#[error("Sending on a disconnected channel")]
	Channel,

	#[error("{0}")]
	Shutdown(String),
}

impl ArchiveError {
	/// True for upstream failures the ingestion loops absorb by skipping to
	/// the next match or cycle.
	pub fn is_transient(&self) -> bool {
		matches!(self, ArchiveError::ProviderNetwork(_) | ArchiveError::ProviderHttp(_) | ArchiveError::Sql(_))
	}
}

impl<T> From<flume::SendError<T>> for ArchiveError {
	fn from(_: flume::SendError<T>) -> Self {
		Self::Channel
	}
}
