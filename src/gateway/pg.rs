/*
 * Copyright 2026 UdavFS contributors
 *
 * This file is part of UdavFS.
 *
 * UdavFS is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * UdavFS is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * UdavFS. If not, see <https://www.gnu.org/licenses/>.
 */

//! The real [`Gateway`] backend: a `postgres::Client` held in autocommit
//! mode, connected over TLS. The generic `one_row`/`all_rows` helpers
//! enforce the single-row / unique-row fetch semantics `spec.md` §4.1
//! describes; every typed method below is a thin SQL statement built on top
//! of them.

use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use postgres_native_tls::MakeTlsConnector;

use super::{DirEntryRow, Gateway, HeaderRow, InodePatch, InodeRow, NewInode};
use crate::errno::GatewayError;

/// Either a TLS-wrapped connection (the default, `sslmode=require`) or a
/// plain one. Kept generic over `postgres::Client`'s transport parameter so
/// tests that do exercise a real server (none ship in this crate, but
/// downstream integration tests might) aren't forced through TLS.
pub struct PgGateway {
	client: Client,
}

impl PgGateway {
	/// Connects using `connector`, which callers build with
	/// `postgres_native_tls::MakeTlsConnector` after forcing
	/// `sslmode=require` on the connection string (see `bin.rs`).
	pub fn connect(conn_str: &str, connector: MakeTlsConnector) -> Result<Self, GatewayError> {
		let client = Client::connect(conn_str, connector)
			.map_err(|e| GatewayError::Backend(e.to_string()))?;
		Ok(Self { client })
	}

	/// Connects without TLS. Only useful against a local Unix-socket
	/// Postgres or a test harness; production mounts always go through
	/// [`Self::connect`].
	pub fn connect_no_tls(conn_str: &str) -> Result<Self, GatewayError> {
		let client = Client::connect(conn_str, NoTls).map_err(|e| GatewayError::Backend(e.to_string()))?;
		Ok(Self { client })
	}

	fn one_row(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Row, GatewayError> {
		let mut rows = self.all_rows_raw(sql, params)?;
		match rows.len() {
			0 => Err(GatewayError::NoSuchRow),
			1 => Ok(rows.remove(0)),
			_ => Err(GatewayError::NotUnique),
		}
	}

	fn maybe_row(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Option<Row>, GatewayError> {
		let mut rows = self.all_rows_raw(sql, params)?;
		match rows.len() {
			0 => Ok(None),
			1 => Ok(Some(rows.remove(0))),
			_ => Err(GatewayError::NotUnique),
		}
	}

	fn all_rows_raw(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, GatewayError> {
		self.client
			.query(sql, params)
			.map_err(|e| map_pg_error(&e))
	}

	fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, GatewayError> {
		self.client
			.execute(sql, params)
			.map_err(|e| map_pg_error(&e))
	}
}

/// A unique-violation on `(fsid, parent_inode, name)` or `(fsid, inode_id)`
/// is the one constraint failure the store vocabulary expects to see and
/// maps to `GatewayError::Conflict` (EEXIST); everything else is an opaque
/// backend failure.
fn map_pg_error(e: &postgres::Error) -> GatewayError {
	if let Some(db_err) = e.as_db_error() {
		if db_err.code() == &postgres::error::SqlState::UNIQUE_VIOLATION {
			return GatewayError::Conflict;
		}
	}
	GatewayError::Backend(e.to_string())
}

fn row_to_header(row: &Row) -> HeaderRow {
	HeaderRow {
		blocksize: row.get("blocksize"),
		capacity: row.get("capacity"),
	}
}

fn row_to_inode(row: &Row) -> InodeRow {
	InodeRow {
		inode_id: row.get("inode_id"),
		mode: row.get("mode"),
		uid: row.get("uid"),
		gid: row.get("gid"),
		target: row.get("target"),
		rdev: row.get("rdev"),
		size: row.get("size"),
		atime_ns: row.get("atime_ns"),
		mtime_ns: row.get("mtime_ns"),
		ctime_ns: row.get("ctime_ns"),
	}
}

fn row_to_dirent(row: &Row) -> DirEntryRow {
	DirEntryRow {
		rowid: row.get("rowid"),
		parent_inode: row.get("parent_inode"),
		name: row.get("name"),
		inode_id: row.get("inode_id"),
	}
}

impl Gateway for PgGateway {
	fn ensure_schema(&mut self) -> Result<(), GatewayError> {
		self.execute(
			"CREATE TABLE IF NOT EXISTS fsinfo (
                fsid TEXT PRIMARY KEY,
                blocksize BIGINT NOT NULL,
                capacity BIGINT NOT NULL
            )",
			&[],
		)?;
		self.execute(
			"CREATE TABLE IF NOT EXISTS inodes (
                fsid TEXT NOT NULL REFERENCES fsinfo(fsid) ON DELETE CASCADE,
                inode_id BIGINT NOT NULL,
                mode INTEGER NOT NULL,
                uid INTEGER NOT NULL,
                gid INTEGER NOT NULL,
                target BYTEA,
                rdev BIGINT NOT NULL DEFAULT 0,
                size BIGINT NOT NULL DEFAULT 0,
                atime_ns BIGINT NOT NULL,
                mtime_ns BIGINT NOT NULL,
                ctime_ns BIGINT NOT NULL,
                PRIMARY KEY (fsid, inode_id)
            )",
			&[],
		)?;
		self.execute(
			"CREATE TABLE IF NOT EXISTS inode_seq (
                fsid TEXT PRIMARY KEY REFERENCES fsinfo(fsid) ON DELETE CASCADE,
                next_id BIGINT NOT NULL
            )",
			&[],
		)?;
		self.execute(
			"CREATE TABLE IF NOT EXISTS contents (
                fsid TEXT NOT NULL REFERENCES fsinfo(fsid) ON DELETE CASCADE,
                rowid BIGSERIAL,
                parent_inode BIGINT NOT NULL,
                name TEXT NOT NULL,
                inode_id BIGINT NOT NULL,
                PRIMARY KEY (fsid, parent_inode, name),
                FOREIGN KEY (fsid, inode_id) REFERENCES inodes(fsid, inode_id) ON DELETE CASCADE
            )",
			&[],
		)?;
		self.execute(
			"CREATE TABLE IF NOT EXISTS body (
                fsid TEXT NOT NULL,
                inode_id BIGINT NOT NULL,
                block_no BIGINT NOT NULL,
                data BYTEA NOT NULL,
                PRIMARY KEY (fsid, inode_id, block_no),
                FOREIGN KEY (fsid, inode_id) REFERENCES inodes(fsid, inode_id) ON DELETE CASCADE
            )",
			&[],
		)?;
		Ok(())
	}

	fn header(&mut self, fsid: &str) -> Result<Option<HeaderRow>, GatewayError> {
		Ok(self
			.maybe_row("SELECT blocksize, capacity FROM fsinfo WHERE fsid = $1", &[&fsid])?
			.as_ref()
			.map(row_to_header))
	}

	fn insert_header(&mut self, fsid: &str, blocksize: i64, capacity: i64) -> Result<(), GatewayError> {
		self.execute(
			"INSERT INTO fsinfo (fsid, blocksize, capacity) VALUES ($1, $2, $3)",
			&[&fsid, &blocksize, &capacity],
		)?;
		self.execute(
			"INSERT INTO inode_seq (fsid, next_id) VALUES ($1, 2)",
			&[&fsid],
		)?;
		Ok(())
	}

	fn get_inode(&mut self, fsid: &str, inode_id: i64) -> Result<Option<InodeRow>, GatewayError> {
		Ok(self
			.maybe_row(
				"SELECT inode_id, mode, uid, gid, target, rdev, size, atime_ns, mtime_ns, ctime_ns
                 FROM inodes WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id],
			)?
			.as_ref()
			.map(row_to_inode))
	}

	fn next_inode_id(&mut self, fsid: &str) -> Result<i64, GatewayError> {
		let row = self.one_row(
			"UPDATE inode_seq SET next_id = next_id + 1 WHERE fsid = $1 RETURNING next_id - 1",
			&[&fsid],
		)?;
		Ok(row.get(0))
	}

	fn insert_inode(&mut self, fsid: &str, inode_id: i64, row: &NewInode) -> Result<(), GatewayError> {
		self.execute(
			"INSERT INTO inodes
                (fsid, inode_id, mode, uid, gid, target, rdev, size, atime_ns, mtime_ns, ctime_ns)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10)",
			&[
				&fsid,
				&inode_id,
				&row.mode,
				&row.uid,
				&row.gid,
				&row.target,
				&row.rdev,
				&row.atime_ns,
				&row.mtime_ns,
				&row.ctime_ns,
			],
		)?;
		Ok(())
	}

	fn update_inode(&mut self, fsid: &str, inode_id: i64, patch: &InodePatch) -> Result<(), GatewayError> {
		// A handful of fixed, independently-committed UPDATEs rather than a
		// single dynamically-built statement: the patch touches at most a
		// few fields per call and autocommit already rules out atomicity
		// across them (spec.md §4.1/§5), so there is nothing to gain from a
		// query builder here.
		if let Some(mode) = patch.mode {
			self.execute(
				"UPDATE inodes SET mode = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &mode],
			)?;
		}
		if let Some(uid) = patch.uid {
			self.execute(
				"UPDATE inodes SET uid = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &uid],
			)?;
		}
		if let Some(gid) = patch.gid {
			self.execute(
				"UPDATE inodes SET gid = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &gid],
			)?;
		}
		if let Some(size) = patch.size {
			self.execute(
				"UPDATE inodes SET size = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &size],
			)?;
		}
		if let Some(rdev) = patch.rdev {
			self.execute(
				"UPDATE inodes SET rdev = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &rdev],
			)?;
		}
		if let Some(atime_ns) = patch.atime_ns {
			self.execute(
				"UPDATE inodes SET atime_ns = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &atime_ns],
			)?;
		}
		if let Some(mtime_ns) = patch.mtime_ns {
			self.execute(
				"UPDATE inodes SET mtime_ns = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &mtime_ns],
			)?;
		}
		if let Some(ctime_ns) = patch.ctime_ns {
			self.execute(
				"UPDATE inodes SET ctime_ns = $3 WHERE fsid = $1 AND inode_id = $2",
				&[&fsid, &inode_id, &ctime_ns],
			)?;
		}
		Ok(())
	}

	fn delete_inode(&mut self, fsid: &str, inode_id: i64) -> Result<(), GatewayError> {
		self.execute(
			"DELETE FROM inodes WHERE fsid = $1 AND inode_id = $2",
			&[&fsid, &inode_id],
		)?;
		Ok(())
	}

	fn count_inodes(&mut self, fsid: &str) -> Result<i64, GatewayError> {
		let row = self.one_row("SELECT count(*) FROM inodes WHERE fsid = $1", &[&fsid])?;
		Ok(row.get(0))
	}

	fn sum_inode_sizes(&mut self, fsid: &str) -> Result<i64, GatewayError> {
		let row = self.one_row(
			"SELECT COALESCE(sum(size), 0) FROM inodes WHERE fsid = $1",
			&[&fsid],
		)?;
		Ok(row.get(0))
	}

	fn get_dirent(&mut self, fsid: &str, parent: i64, name: &str) -> Result<Option<DirEntryRow>, GatewayError> {
		Ok(self
			.maybe_row(
				"SELECT rowid, parent_inode, name, inode_id FROM contents
                 WHERE fsid = $1 AND parent_inode = $2 AND name = $3",
				&[&fsid, &parent, &name],
			)?
			.as_ref()
			.map(row_to_dirent))
	}

	fn insert_dirent(&mut self, fsid: &str, parent: i64, name: &str, inode_id: i64) -> Result<(), GatewayError> {
		self.execute(
			"INSERT INTO contents (fsid, parent_inode, name, inode_id) VALUES ($1, $2, $3, $4)",
			&[&fsid, &parent, &name, &inode_id],
		)?;
		Ok(())
	}

	fn retarget_dirent(&mut self, fsid: &str, parent: i64, name: &str, inode_id: i64) -> Result<(), GatewayError> {
		self.execute(
			"UPDATE contents SET inode_id = $4 WHERE fsid = $1 AND parent_inode = $2 AND name = $3",
			&[&fsid, &parent, &name, &inode_id],
		)?;
		Ok(())
	}

	fn move_dirent(
		&mut self,
		fsid: &str,
		parent: i64,
		name: &str,
		new_parent: i64,
		new_name: &str,
	) -> Result<(), GatewayError> {
		self.execute(
			"UPDATE contents SET parent_inode = $4, name = $5
             WHERE fsid = $1 AND parent_inode = $2 AND name = $3",
			&[&fsid, &parent, &name, &new_parent, &new_name],
		)?;
		Ok(())
	}

	fn delete_dirent(&mut self, fsid: &str, parent: i64, name: &str) -> Result<(), GatewayError> {
		self.execute(
			"DELETE FROM contents WHERE fsid = $1 AND parent_inode = $2 AND name = $3",
			&[&fsid, &parent, &name],
		)?;
		Ok(())
	}

	fn count_links(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError> {
		let row = self.one_row(
			"SELECT count(*) FROM contents WHERE fsid = $1 AND inode_id = $2",
			&[&fsid, &inode_id],
		)?;
		Ok(row.get(0))
	}

	fn count_children(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError> {
		let row = self.one_row(
			"SELECT count(*) FROM contents WHERE fsid = $1 AND parent_inode = $2",
			&[&fsid, &inode_id],
		)?;
		Ok(row.get(0))
	}

	fn list_dirents_after(
		&mut self,
		fsid: &str,
		parent: i64,
		after_rowid: i64,
	) -> Result<Vec<DirEntryRow>, GatewayError> {
		let rows = self.all_rows_raw(
			"SELECT rowid, parent_inode, name, inode_id FROM contents
             WHERE fsid = $1 AND parent_inode = $2 AND rowid > $3
             ORDER BY rowid ASC",
			&[&fsid, &parent, &after_rowid],
		)?;
		Ok(rows.iter().map(row_to_dirent).collect())
	}

	fn get_block(&mut self, fsid: &str, inode_id: i64, block_no: i64) -> Result<Option<Vec<u8>>, GatewayError> {
		Ok(self
			.maybe_row(
				"SELECT data FROM body WHERE fsid = $1 AND inode_id = $2 AND block_no = $3",
				&[&fsid, &inode_id, &block_no],
			)?
			.map(|r| r.get(0)))
	}

	fn list_blocks(
		&mut self,
		fsid: &str,
		inode_id: i64,
		first: i64,
		last: i64,
	) -> Result<Vec<(i64, Vec<u8>)>, GatewayError> {
		let rows = self.all_rows_raw(
			"SELECT block_no, data FROM body
             WHERE fsid = $1 AND inode_id = $2 AND block_no BETWEEN $3 AND $4
             ORDER BY block_no ASC",
			&[&fsid, &inode_id, &first, &last],
		)?;
		Ok(rows.iter().map(|r| (r.get(0), r.get(1))).collect())
	}

	fn insert_block(&mut self, fsid: &str, inode_id: i64, block_no: i64, data: &[u8]) -> Result<(), GatewayError> {
		self.execute(
			"INSERT INTO body (fsid, inode_id, block_no, data) VALUES ($1, $2, $3, $4)",
			&[&fsid, &inode_id, &block_no, &data],
		)?;
		Ok(())
	}

	fn update_block(&mut self, fsid: &str, inode_id: i64, block_no: i64, data: &[u8]) -> Result<(), GatewayError> {
		// Keyed by (fsid, inode_id, block_no) — not the reference's
		// apparent bug of omitting block_no (spec.md §9 Open Questions).
		self.execute(
			"UPDATE body SET data = $4 WHERE fsid = $1 AND inode_id = $2 AND block_no = $3",
			&[&fsid, &inode_id, &block_no, &data],
		)?;
		Ok(())
	}

	fn delete_block(&mut self, fsid: &str, inode_id: i64, block_no: i64) -> Result<(), GatewayError> {
		self.execute(
			"DELETE FROM body WHERE fsid = $1 AND inode_id = $2 AND block_no = $3",
			&[&fsid, &inode_id, &block_no],
		)?;
		Ok(())
	}

	fn delete_blocks_from(&mut self, fsid: &str, inode_id: i64, from: i64) -> Result<(), GatewayError> {
		self.execute(
			"DELETE FROM body WHERE fsid = $1 AND inode_id = $2 AND block_no >= $3",
			&[&fsid, &inode_id, &from],
		)?;
		Ok(())
	}

	fn count_blocks(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError> {
		let row = self.one_row(
			"SELECT count(*) FROM body WHERE fsid = $1 AND inode_id = $2",
			&[&fsid, &inode_id],
		)?;
		Ok(row.get(0))
	}
}
