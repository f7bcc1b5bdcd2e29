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

//! The Storage Gateway: the typed query vocabulary the Inode & Directory
//! Store and the File-Body Engine issue against the backing row store.
//!
//! `Gateway` is a trait rather than a concrete `postgres::Client` wrapper so
//! that those upper layers can be exercised against an in-memory fake
//! (`mem::MemGateway`, test-only) without a live database. [`pg::PgGateway`]
//! is the real backend; it owns the generic `one_row`/`all_rows` SQL
//! execution primitives described in `spec.md` §4.1 and uses them to
//! implement every method below.

pub mod pg;

#[cfg(test)]
pub mod mem;

use crate::errno::GatewayError;

/// The header row for one `fsid`.
#[derive(Debug, Clone, Copy)]
pub struct HeaderRow {
	pub blocksize: i64,
	pub capacity: i64,
}

/// An inode row, exactly as stored.
#[derive(Debug, Clone)]
pub struct InodeRow {
	pub inode_id: i64,
	pub mode: i32,
	pub uid: i32,
	pub gid: i32,
	pub target: Option<Vec<u8>>,
	pub rdev: i64,
	pub size: i64,
	pub atime_ns: i64,
	pub mtime_ns: i64,
	pub ctime_ns: i64,
}

/// The fields supplied when inserting a new inode; `inode_id` is assigned
/// separately by [`Gateway::next_inode_id`].
#[derive(Debug, Clone)]
pub struct NewInode {
	pub mode: i32,
	pub uid: i32,
	pub gid: i32,
	pub target: Option<Vec<u8>>,
	pub rdev: i64,
	pub atime_ns: i64,
	pub mtime_ns: i64,
	pub ctime_ns: i64,
}

/// A sparse patch applied to an existing inode row. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct InodePatch {
	pub mode: Option<i32>,
	pub uid: Option<i32>,
	pub gid: Option<i32>,
	pub size: Option<i64>,
	pub rdev: Option<i64>,
	pub atime_ns: Option<i64>,
	pub mtime_ns: Option<i64>,
	pub ctime_ns: Option<i64>,
}

/// A directory entry row.
#[derive(Debug, Clone)]
pub struct DirEntryRow {
	pub rowid: i64,
	pub parent_inode: i64,
	pub name: String,
	pub inode_id: i64,
}

/// The typed query vocabulary consumed by the store and body engine. All
/// methods are scoped to a single `fsid`, passed explicitly on every call
/// since one backend connection may serve several logical filesystems.
pub trait Gateway {
	// -- schema & bootstrap --------------------------------------------
	fn ensure_schema(&mut self) -> Result<(), GatewayError>;
	fn header(&mut self, fsid: &str) -> Result<Option<HeaderRow>, GatewayError>;
	fn insert_header(&mut self, fsid: &str, blocksize: i64, capacity: i64) -> Result<(), GatewayError>;

	// -- inodes -----------------------------------------------------------
	fn get_inode(&mut self, fsid: &str, inode_id: i64) -> Result<Option<InodeRow>, GatewayError>;
	/// Allocates the next monotonic `inode_id` for `fsid` (root excluded; it
	/// is always `model::ROOT_INODE` and is never handed out here).
	fn next_inode_id(&mut self, fsid: &str) -> Result<i64, GatewayError>;
	fn insert_inode(&mut self, fsid: &str, inode_id: i64, row: &NewInode) -> Result<(), GatewayError>;
	fn update_inode(&mut self, fsid: &str, inode_id: i64, patch: &InodePatch) -> Result<(), GatewayError>;
	fn delete_inode(&mut self, fsid: &str, inode_id: i64) -> Result<(), GatewayError>;
	fn count_inodes(&mut self, fsid: &str) -> Result<i64, GatewayError>;
	fn sum_inode_sizes(&mut self, fsid: &str) -> Result<i64, GatewayError>;

	// -- directory entries --------------------------------------------------
	fn get_dirent(&mut self, fsid: &str, parent: i64, name: &str) -> Result<Option<DirEntryRow>, GatewayError>;
	fn insert_dirent(&mut self, fsid: &str, parent: i64, name: &str, inode_id: i64) -> Result<(), GatewayError>;
	fn retarget_dirent(&mut self, fsid: &str, parent: i64, name: &str, inode_id: i64) -> Result<(), GatewayError>;
	fn move_dirent(
		&mut self,
		fsid: &str,
		parent: i64,
		name: &str,
		new_parent: i64,
		new_name: &str,
	) -> Result<(), GatewayError>;
	fn delete_dirent(&mut self, fsid: &str, parent: i64, name: &str) -> Result<(), GatewayError>;
	/// Number of directory entries pointing *at* `inode_id` (its link count).
	fn count_links(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError>;
	/// Number of directory entries whose parent is `inode_id` (is it empty?).
	fn count_children(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError>;
	fn list_dirents_after(
		&mut self,
		fsid: &str,
		parent: i64,
		after_rowid: i64,
	) -> Result<Vec<DirEntryRow>, GatewayError>;

	// -- blocks -------------------------------------------------------------
	fn get_block(&mut self, fsid: &str, inode_id: i64, block_no: i64) -> Result<Option<Vec<u8>>, GatewayError>;
	fn list_blocks(
		&mut self,
		fsid: &str,
		inode_id: i64,
		first: i64,
		last: i64,
	) -> Result<Vec<(i64, Vec<u8>)>, GatewayError>;
	fn insert_block(&mut self, fsid: &str, inode_id: i64, block_no: i64, data: &[u8]) -> Result<(), GatewayError>;
	fn update_block(&mut self, fsid: &str, inode_id: i64, block_no: i64, data: &[u8]) -> Result<(), GatewayError>;
	fn delete_block(&mut self, fsid: &str, inode_id: i64, block_no: i64) -> Result<(), GatewayError>;
	/// Deletes every block with `block_no >= from`, used by shrink to drop a
	/// run of trailing full blocks in one statement.
	fn delete_blocks_from(&mut self, fsid: &str, inode_id: i64, from: i64) -> Result<(), GatewayError>;
	fn count_blocks(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError>;
}
