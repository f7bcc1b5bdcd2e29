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

//! `unlink`/`rmdir` (via the shared `_remove` path), `link`, and `rename`
//! (`spec.md` §4.3).

use super::{require_live_parent, Store};
use crate::errno::{Errno, UdavResult};
use crate::gateway::Gateway;
use crate::model::{Attr, FileKind};

impl<G: Gateway> Store<G> {
	/// `link(inode, new_parent, new_name) -> entry`.
	pub fn link(&mut self, inode_id: i64, new_parent: i64, new_name: &str) -> UdavResult<Attr> {
		require_live_parent(&mut self.gateway, &self.fsid, new_parent)?;
		self.gateway
			.insert_dirent(&self.fsid, new_parent, new_name, inode_id)
			.map_err(|e| match e {
				crate::errno::GatewayError::Conflict => Errno::Exist,
				other => other.into(),
			})?;
		self.getattr(inode_id)
	}

	/// `unlink(parent, name)`. Fails `EISDIR` if the target is a directory.
	pub fn unlink(&mut self, parent: i64, name: &str) -> UdavResult<()> {
		let (dirent_inode, is_dir) = self.resolve_for_removal(parent, name)?;
		if is_dir {
			return Err(Errno::IsDir);
		}
		self.remove_common(parent, name, dirent_inode)
	}

	/// `rmdir(parent, name)`. Fails `ENOTDIR` if the target is not a
	/// directory.
	pub fn rmdir(&mut self, parent: i64, name: &str) -> UdavResult<()> {
		let (dirent_inode, is_dir) = self.resolve_for_removal(parent, name)?;
		if !is_dir {
			return Err(Errno::NotDir);
		}
		self.remove_common(parent, name, dirent_inode)
	}

	fn resolve_for_removal(&mut self, parent: i64, name: &str) -> UdavResult<(i64, bool)> {
		let dirent = self
			.gateway
			.get_dirent(&self.fsid, parent, name)?
			.ok_or(Errno::NoEnt)?;
		let row = self.fetch_inode(dirent.inode_id)?;
		let is_dir = FileKind::from_mode(row.mode as u32) == Some(FileKind::Directory);
		Ok((dirent.inode_id, is_dir))
	}

	/// `_remove`: fails `ENOTEMPTY` if the target directory has children;
	/// otherwise deletes the directory entry and, if the pre-removal link
	/// count was 1 and the inode isn't open, deletes the inode too.
	fn remove_common(&mut self, parent: i64, name: &str, target_inode: i64) -> UdavResult<()> {
		let children = self.gateway.count_children(&self.fsid, target_inode)?;
		if children > 0 {
			return Err(Errno::NotEmpty);
		}
		let links_before = self.gateway.count_links(&self.fsid, target_inode)?;
		self.gateway.delete_dirent(&self.fsid, parent, name)?;
		if links_before == 1 {
			self.delete_if_orphaned(target_inode)?;
		}
		Ok(())
	}

	/// `rename(old_parent, old_name, new_parent, new_name)`.
	pub fn rename(&mut self, old_parent: i64, old_name: &str, new_parent: i64, new_name: &str) -> UdavResult<()> {
		let old = self
			.gateway
			.get_dirent(&self.fsid, old_parent, old_name)?
			.ok_or(Errno::NoEnt)?;

		match self.gateway.get_dirent(&self.fsid, new_parent, new_name)? {
			None => {
				self.gateway
					.move_dirent(&self.fsid, old_parent, old_name, new_parent, new_name)?;
			}
			Some(existing) => {
				let children = self.gateway.count_children(&self.fsid, existing.inode_id)?;
				if children > 0 {
					return Err(Errno::NotEmpty);
				}
				let displaced_links = self.gateway.count_links(&self.fsid, existing.inode_id)?;
				self.gateway
					.retarget_dirent(&self.fsid, new_parent, new_name, old.inode_id)?;
				self.gateway.delete_dirent(&self.fsid, old_parent, old_name)?;
				if displaced_links == 1 {
					self.delete_if_orphaned(existing.inode_id)?;
				}
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gateway::mem::MemGateway;
	use crate::model::{Context, ROOT_INODE};
	use crate::schema::bootstrap;
	use crate::store::Store;

	fn new_store() -> Store<MemGateway> {
		let mut gw = MemGateway::new();
		bootstrap(&mut gw, "fs1", 4096, 1 << 20, 0, 0, 1).unwrap();
		Store::new(gw, "fs1".to_string(), 4096, 1 << 20)
	}

	fn mkdir(store: &mut Store<MemGateway>, parent: i64, name: &str) -> Attr {
		let ctx = Context { uid: 0, gid: 0 };
		let mode = FileKind::Directory.type_bits() | 0o755;
		store.mkdir(ctx, parent, name, mode).unwrap()
	}

	#[test]
	fn hard_link_raises_nlink_and_survives_one_unlink() {
		let mut store = new_store();
		let ctx = Context { uid: 0, gid: 0 };
		let (a, h) = store.create(ctx, ROOT_INODE, "a", 0o644).unwrap();
		store.release(h).unwrap();
		let linked = store.link(a.inode_id, ROOT_INODE, "b").unwrap();
		assert_eq!(linked.nlink, 2);
		store.unlink(ROOT_INODE, "a").unwrap();
		assert!(store.getattr(a.inode_id).is_ok());
		store.unlink(ROOT_INODE, "b").unwrap();
		assert_eq!(store.getattr(a.inode_id).unwrap_err().raw(), libc::ENOENT);
	}

	#[test]
	fn rmdir_non_empty_fails() {
		let mut store = new_store();
		let d = mkdir(&mut store, ROOT_INODE, "d");
		let ctx = Context { uid: 0, gid: 0 };
		let (_, h) = store.create(ctx, d.inode_id, "z", 0o644).unwrap();
		store.release(h).unwrap();
		let err = store.rmdir(ROOT_INODE, "d").unwrap_err();
		assert_eq!(err.raw(), libc::ENOTEMPTY);
	}

	#[test]
	fn rename_over_empty_directory_succeeds() {
		let mut store = new_store();
		mkdir(&mut store, ROOT_INODE, "x");
		mkdir(&mut store, ROOT_INODE, "y");
		store.rename(ROOT_INODE, "x", ROOT_INODE, "y").unwrap();
		assert_eq!(store.lookup(ROOT_INODE, "x").unwrap_err().raw(), libc::ENOENT);
		let y = store.lookup(ROOT_INODE, "y").unwrap();
		assert_eq!(y.kind(), Some(FileKind::Directory));
	}

	#[test]
	fn rename_over_non_empty_directory_fails() {
		let mut store = new_store();
		mkdir(&mut store, ROOT_INODE, "x");
		let y = mkdir(&mut store, ROOT_INODE, "y");
		let ctx = Context { uid: 0, gid: 0 };
		let (_, h) = store.create(ctx, y.inode_id, "z", 0o644).unwrap();
		store.release(h).unwrap();
		let err = store.rename(ROOT_INODE, "x", ROOT_INODE, "y").unwrap_err();
		assert_eq!(err.raw(), libc::ENOTEMPTY);
	}

	#[test]
	fn unlink_on_directory_is_eisdir_rmdir_on_file_is_enotdir() {
		let mut store = new_store();
		mkdir(&mut store, ROOT_INODE, "d");
		let ctx = Context { uid: 0, gid: 0 };
		let (_, h) = store.create(ctx, ROOT_INODE, "f", 0o644).unwrap();
		store.release(h).unwrap();
		assert_eq!(store.unlink(ROOT_INODE, "d").unwrap_err().raw(), libc::EISDIR);
		assert_eq!(store.rmdir(ROOT_INODE, "f").unwrap_err().raw(), libc::ENOTDIR);
	}
}
