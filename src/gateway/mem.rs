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

//! An in-memory [`Gateway`] fake, keyed and constrained exactly like the
//! Postgres schema, used only by `#[cfg(test)]` code. This is what lets the
//! Inode & Directory Store and the File-Body Engine be exercised
//! deterministically without a live database — the same motivation behind
//! `dirkpetersen-claudefs`'s in-memory `InodeTable` test double.

use std::collections::BTreeMap;

use super::{DirEntryRow, Gateway, HeaderRow, InodePatch, InodeRow, NewInode};
use crate::errno::GatewayError;

#[derive(Default)]
pub struct MemGateway {
	headers: BTreeMap<String, HeaderRow>,
	next_ids: BTreeMap<String, i64>,
	inodes: BTreeMap<(String, i64), InodeRow>,
	dirents: BTreeMap<(String, i64, String), DirEntryRow>,
	next_rowid: i64,
	blocks: BTreeMap<(String, i64, i64), Vec<u8>>,
}

impl MemGateway {
	pub fn new() -> Self {
		Self {
			next_rowid: 1,
			..Default::default()
		}
	}
}

impl Gateway for MemGateway {
	fn ensure_schema(&mut self) -> Result<(), GatewayError> {
		Ok(())
	}

	fn header(&mut self, fsid: &str) -> Result<Option<HeaderRow>, GatewayError> {
		Ok(self.headers.get(fsid).copied())
	}

	fn insert_header(&mut self, fsid: &str, blocksize: i64, capacity: i64) -> Result<(), GatewayError> {
		self.headers.insert(fsid.to_string(), HeaderRow { blocksize, capacity });
		self.next_ids.insert(fsid.to_string(), 2);
		Ok(())
	}

	fn get_inode(&mut self, fsid: &str, inode_id: i64) -> Result<Option<InodeRow>, GatewayError> {
		Ok(self.inodes.get(&(fsid.to_string(), inode_id)).cloned())
	}

	fn next_inode_id(&mut self, fsid: &str) -> Result<i64, GatewayError> {
		let next = self.next_ids.entry(fsid.to_string()).or_insert(2);
		let id = *next;
		*next += 1;
		Ok(id)
	}

	fn insert_inode(&mut self, fsid: &str, inode_id: i64, row: &NewInode) -> Result<(), GatewayError> {
		let key = (fsid.to_string(), inode_id);
		if self.inodes.contains_key(&key) {
			return Err(GatewayError::Conflict);
		}
		self.inodes.insert(
			key,
			InodeRow {
				inode_id,
				mode: row.mode,
				uid: row.uid,
				gid: row.gid,
				target: row.target.clone(),
				rdev: row.rdev,
				size: 0,
				atime_ns: row.atime_ns,
				mtime_ns: row.mtime_ns,
				ctime_ns: row.ctime_ns,
			},
		);
		Ok(())
	}

	fn update_inode(&mut self, fsid: &str, inode_id: i64, patch: &InodePatch) -> Result<(), GatewayError> {
		let row = self
			.inodes
			.get_mut(&(fsid.to_string(), inode_id))
			.ok_or(GatewayError::NoSuchRow)?;
		if let Some(v) = patch.mode {
			row.mode = v;
		}
		if let Some(v) = patch.uid {
			row.uid = v;
		}
		if let Some(v) = patch.gid {
			row.gid = v;
		}
		if let Some(v) = patch.size {
			row.size = v;
		}
		if let Some(v) = patch.rdev {
			row.rdev = v;
		}
		if let Some(v) = patch.atime_ns {
			row.atime_ns = v;
		}
		if let Some(v) = patch.mtime_ns {
			row.mtime_ns = v;
		}
		if let Some(v) = patch.ctime_ns {
			row.ctime_ns = v;
		}
		Ok(())
	}

	fn delete_inode(&mut self, fsid: &str, inode_id: i64) -> Result<(), GatewayError> {
		self.inodes.remove(&(fsid.to_string(), inode_id));
		// Mirror the real schema's cascading delete from inodes to body.
		let dead: Vec<_> = self
			.blocks
			.keys()
			.filter(|(f, i, _)| f == fsid && *i == inode_id)
			.cloned()
			.collect();
		for k in dead {
			self.blocks.remove(&k);
		}
		Ok(())
	}

	fn count_inodes(&mut self, fsid: &str) -> Result<i64, GatewayError> {
		Ok(self.inodes.keys().filter(|(f, _)| f == fsid).count() as i64)
	}

	fn sum_inode_sizes(&mut self, fsid: &str) -> Result<i64, GatewayError> {
		Ok(self
			.inodes
			.iter()
			.filter(|((f, _), _)| f == fsid)
			.map(|(_, row)| row.size)
			.sum())
	}

	fn get_dirent(&mut self, fsid: &str, parent: i64, name: &str) -> Result<Option<DirEntryRow>, GatewayError> {
		Ok(self.dirents.get(&(fsid.to_string(), parent, name.to_string())).cloned())
	}

	fn insert_dirent(&mut self, fsid: &str, parent: i64, name: &str, inode_id: i64) -> Result<(), GatewayError> {
		let key = (fsid.to_string(), parent, name.to_string());
		if self.dirents.contains_key(&key) {
			return Err(GatewayError::Conflict);
		}
		let rowid = self.next_rowid;
		self.next_rowid += 1;
		self.dirents.insert(
			key,
			DirEntryRow {
				rowid,
				parent_inode: parent,
				name: name.to_string(),
				inode_id,
			},
		);
		Ok(())
	}

	fn retarget_dirent(&mut self, fsid: &str, parent: i64, name: &str, inode_id: i64) -> Result<(), GatewayError> {
		let row = self
			.dirents
			.get_mut(&(fsid.to_string(), parent, name.to_string()))
			.ok_or(GatewayError::NoSuchRow)?;
		row.inode_id = inode_id;
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
		let old_key = (fsid.to_string(), parent, name.to_string());
		let mut row = self.dirents.remove(&old_key).ok_or(GatewayError::NoSuchRow)?;
		row.parent_inode = new_parent;
		row.name = new_name.to_string();
		self.dirents.insert((fsid.to_string(), new_parent, new_name.to_string()), row);
		Ok(())
	}

	fn delete_dirent(&mut self, fsid: &str, parent: i64, name: &str) -> Result<(), GatewayError> {
		self.dirents.remove(&(fsid.to_string(), parent, name.to_string()));
		Ok(())
	}

	fn count_links(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError> {
		Ok(self
			.dirents
			.iter()
			.filter(|((f, _, _), e)| f == fsid && e.inode_id == inode_id)
			.count() as i64)
	}

	fn count_children(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError> {
		Ok(self
			.dirents
			.iter()
			.filter(|((f, parent, _), _)| f == fsid && *parent == inode_id)
			.count() as i64)
	}

	fn list_dirents_after(
		&mut self,
		fsid: &str,
		parent: i64,
		after_rowid: i64,
	) -> Result<Vec<DirEntryRow>, GatewayError> {
		let mut out: Vec<_> = self
			.dirents
			.iter()
			.filter(|((f, p, _), e)| f == fsid && *p == parent && e.rowid > after_rowid)
			.map(|(_, e)| e.clone())
			.collect();
		out.sort_by_key(|e| e.rowid);
		Ok(out)
	}

	fn get_block(&mut self, fsid: &str, inode_id: i64, block_no: i64) -> Result<Option<Vec<u8>>, GatewayError> {
		Ok(self.blocks.get(&(fsid.to_string(), inode_id, block_no)).cloned())
	}

	fn list_blocks(
		&mut self,
		fsid: &str,
		inode_id: i64,
		first: i64,
		last: i64,
	) -> Result<Vec<(i64, Vec<u8>)>, GatewayError> {
		let mut out: Vec<_> = self
			.blocks
			.iter()
			.filter(|((f, i, b), _)| f == fsid && *i == inode_id && *b >= first && *b <= last)
			.map(|((_, _, b), data)| (*b, data.clone()))
			.collect();
		out.sort_by_key(|(b, _)| *b);
		Ok(out)
	}

	fn insert_block(&mut self, fsid: &str, inode_id: i64, block_no: i64, data: &[u8]) -> Result<(), GatewayError> {
		self.blocks
			.insert((fsid.to_string(), inode_id, block_no), data.to_vec());
		Ok(())
	}

	fn update_block(&mut self, fsid: &str, inode_id: i64, block_no: i64, data: &[u8]) -> Result<(), GatewayError> {
		let slot = self
			.blocks
			.get_mut(&(fsid.to_string(), inode_id, block_no))
			.ok_or(GatewayError::NoSuchRow)?;
		*slot = data.to_vec();
		Ok(())
	}

	fn delete_block(&mut self, fsid: &str, inode_id: i64, block_no: i64) -> Result<(), GatewayError> {
		self.blocks.remove(&(fsid.to_string(), inode_id, block_no));
		Ok(())
	}

	fn delete_blocks_from(&mut self, fsid: &str, inode_id: i64, from: i64) -> Result<(), GatewayError> {
		let dead: Vec<_> = self
			.blocks
			.keys()
			.filter(|(f, i, b)| f == fsid && *i == inode_id && *b >= from)
			.cloned()
			.collect();
		for k in dead {
			self.blocks.remove(&k);
		}
		Ok(())
	}

	fn count_blocks(&mut self, fsid: &str, inode_id: i64) -> Result<i64, GatewayError> {
		Ok(self
			.blocks
			.keys()
			.filter(|(f, i, _)| f == fsid && *i == inode_id)
			.count() as i64)
	}
}
