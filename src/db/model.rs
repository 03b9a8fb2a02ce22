// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Database row mapping for domain models.
//!
//! This module provides the conversion logic between raw SQLite result rows
//! and high-level domain models, ensuring type-safe extraction of model
//! attributes from database queries.

use rusqlite::{
    Result, Row, ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};

use crate::model::{ItemKind, SimpleLibraryItem};

impl SimpleLibraryItem {
    /// Maps an SQLite row to a [`SimpleLibraryItem`] instance.
    ///
    /// The column order must match `ITEM_COLUMNS` in the parent module; this
    /// is a helper designed to be used with
    /// [`rusqlite::Statement::query_map`].
    ///
    /// # Errors
    ///
    /// Returns a [`rusqlite::Error`] if:
    /// * The row does not contain enough columns.
    /// * The data in a column cannot be converted to the required Rust type.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            relative_path: row.get(0)?,
            parent_path: row.get(1)?,
            title: row.get(2)?,
            kind: row.get(3)?,
            duration: row.get(4)?,
            current_time: row.get(5)?,
            percent_completed: row.get(6)?,
            is_finished: row.get(7)?,
            order_rank: row.get(8)?,
            remote_url: row.get(9)?,
            artwork_url: row.get(10)?,
            original_filename: row.get(11)?,
            last_play_date: row.get(12)?,
        })
    }
}

impl ToSql for ItemKind {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        let val = match self {
            ItemKind::Folder => 1,
            ItemKind::Book => 2,
            ItemKind::Bound => 3,
        };
        Ok(ToSqlOutput::from(val))
    }
}

impl FromSql for ItemKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_i64()? {
            1 => Ok(ItemKind::Folder),
            2 => Ok(ItemKind::Book),
            3 => Ok(ItemKind::Bound),
            _ => Err(rusqlite::types::FromSqlError::InvalidType),
        }
    }
}
