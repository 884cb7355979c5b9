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

//! Short-lived bearer tokens mapping opaque strings to user IDs.
//!
//! Consumed by the external HTTP layer. Expiry is checked on every read and
//! expired rows are deleted inline; there is no sliding expiration.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};

use crate::{database::Database, error::Result};

const TOKEN_BYTES: usize = 24;
const TOKEN_TTL_SECS: i64 = 24 * 3600;

#[derive(Clone)]
pub struct TokenStore {
	db: Database,
}

impl TokenStore {
	pub fn new(db: Database) -> Self {
		Self { db }
	}

	/// Mint a URL-safe token for `user_id`, valid for 24 hours.
	pub async fn create_token(&self, user_id: i64) -> Result<String> {
		let mut bytes = [0u8; TOKEN_BYTES];
		OsRng.fill_bytes(&mut bytes);
		let token = URL_SAFE_NO_PAD.encode(bytes);
		let expires_at = Utc::now().timestamp() + TOKEN_TTL_SECS;

		sqlx::query(
			"INSERT INTO tokens (token, user_id, expires_at) VALUES ($1, $2, $3) \
			 ON CONFLICT (token) DO UPDATE SET \
				user_id = excluded.user_id, \
				expires_at = excluded.expires_at",
		)
		.bind(token.as_str())
		.bind(user_id)
		.bind(expires_at)
		.execute(self.db.pool())
		.await?;
		Ok(token)
	}

	/// Resolve a token to its user ID. Unknown and expired tokens both come
	/// back as None; expired rows are removed on the way.
	pub async fn resolve_token(&self, token: &str) -> Result<Option<i64>> {
		let row: Option<(i64, i64)> =
			sqlx::query_as("SELECT user_id, expires_at FROM tokens WHERE token = $1")
				.bind(token)
				.fetch_optional(self.db.pool())
				.await?;

		let (user_id, expires_at) = match row {
			Some(row) => row,
			None => return Ok(None),
		};
		if expires_at < Utc::now().timestamp() {
			sqlx::query("DELETE FROM tokens WHERE token = $1")
				.bind(token)
				.execute(self.db.pool())
				.await?;
			log::debug!("expired token for user {} deleted", user_id);
			return Ok(None);
		}
		Ok(Some(user_id))
	}
}
