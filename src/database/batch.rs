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

//! Chunked multi-row INSERT statements for the bulk rebuild path.
//!
//! Rebuilding aggregates for a full datastore writes on the order of a
//! million pair rows; binding them one statement at a time dominates the
//! transaction. All bulk-written values here are integers, so they are
//! rendered straight into the statement text (no placeholders) and flushed in
//! fixed-size chunks, one statement per chunk.

use sqlx::any::AnyConnection;

use crate::error::Result;

// Large enough to amortize statement overhead, small enough to stay clear of
// both engines' statement-size limits at ~20 digits per value.
const ROWS_PER_STATEMENT: usize = 500;

pub struct Batch {
	name: &'static str,
	leading: String,
	statements: Vec<String>,
	current: String,
	rows_in_current: usize,
	len: usize,
}

impl Batch {
	/// `leading` is the `INSERT INTO t (cols) VALUES ` prefix of every chunk.
	pub fn new(name: &'static str, leading: &str) -> Self {
		Self {
			name,
			leading: leading.to_owned(),
			statements: Vec::new(),
			current: leading.to_owned(),
			rows_in_current: 0,
			len: 0,
		}
	}

	/// Append one `(v1, v2, …)` tuple, starting a new statement when the
	/// current chunk is full.
	pub fn row(&mut self, values: &[i64]) -> Result<()> {
		if self.rows_in_current == ROWS_PER_STATEMENT {
			let full = std::mem::replace(&mut self.current, self.leading.clone());
			self.statements.push(full);
			self.rows_in_current = 0;
		}
		if self.rows_in_current > 0 {
			self.current.push(',');
		}
		self.current.push('(');
		for (i, value) in values.iter().enumerate() {
			if i > 0 {
				self.current.push(',');
			}
			itoa::fmt(&mut self.current, *value)?;
		}
		self.current.push(')');
		self.rows_in_current += 1;
		self.len += 1;
		Ok(())
	}

	pub async fn execute(mut self, conn: &mut AnyConnection) -> Result<u64> {
		if self.rows_in_current > 0 {
			self.statements.push(self.current);
		}
		let mut rows_affected = 0;
		for statement in &self.statements {
			rows_affected += sqlx::query(statement.as_str()).execute(&mut *conn).await?.rows_affected();
		}
		log::debug!("bulk insert into {}: {} rows in {} statements", self.name, self.len, self.statements.len());
		Ok(rows_affected)
	}

	pub fn len(&self) -> usize {
		self.len
	}
}
