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

//! `mknod`/`mkdir`/`symlink`/`create`, all funnelled through the common
//! `_create` path (`spec.md` §4.3).

use super::{now_ns, require_live_parent, Store};
use crate::errno::UdavResult;
use crate::gateway::{Gateway, NewInode};
use crate::model::{Attr, Context, FileKind};

impl<G: Gateway> Store<G> {
	/// `_create(parent, name, mode, ctx, rdev, target)`: asserts the parent
	/// is live, inserts the inode and its directory entry, and returns the
	/// new inode's attributes.
	pub fn create_common(
		&mut self,
		ctx: Context,
		parent: i64,
		name: &str,
		mode: u32,
		rdev: u32,
		target: Option<Vec<u8>>,
	) -> UdavResult<Attr> {
		require_live_parent(&mut self.gateway, &self.fsid, parent)?;
		let now = now_ns();
		let inode_id = self.gateway.next_inode_id(&self.fsid)?;
		self.gateway.insert_inode(
			&self.fsid,
			inode_id,
			&NewInode {
				mode: mode as i32,
				uid: ctx.uid as i32,
				gid: ctx.gid as i32,
				target,
				rdev: rdev as i64,
				atime_ns: now,
				mtime_ns: now,
				ctime_ns: now,
			},
		)?;
		self.gateway.insert_dirent(&self.fsid, parent, name, inode_id)?;
		self.getattr(inode_id)
	}

	/// `mknod(parent, name, mode, rdev)`. `mode` already carries the
	/// requested file-type bits (regular, fifo, char/block device).
	pub fn mknod(&mut self, ctx: Context, parent: i64, name: &str, mode: u32, rdev: u32) -> UdavResult<Attr> {
		self.create_common(ctx, parent, name, mode, rdev, None)
	}

	/// `mkdir(parent, name, mode)`. The caller is expected to have set the
	/// directory-type bit in `mode`; this just forwards it.
	pub fn mkdir(&mut self, ctx: Context, parent: i64, name: &str, mode: u32) -> UdavResult<Attr> {
		self.create_common(ctx, parent, name, mode, 0, None)
	}

	/// `symlink(parent, name, target)`. Mode is forced to symlink-type with
	/// rwx for every class, matching `spec.md` §4.3.
	pub fn symlink(&mut self, ctx: Context, parent: i64, name: &str, target: Vec<u8>) -> UdavResult<Attr> {
		let mode = FileKind::Symlink.type_bits() | 0o777;
		self.create_common(ctx, parent, name, mode, 0, Some(target))
	}

	/// `create(parent, name, mode)`. Like `mknod` for a regular file, but
	/// also opens the new inode and returns its handle alongside the
	/// attributes.
	pub fn create(&mut self, ctx: Context, parent: i64, name: &str, mode: u32) -> UdavResult<(Attr, u64)> {
		let mode = FileKind::Regular.type_bits() | (mode & 0o7777);
		let attr = self.create_common(ctx, parent, name, mode, 0, None)?;
		let handle = self.open(attr.inode_id)?;
		Ok((attr, handle))
	}
}
