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

//! Schema & Bootstrap: detects whether this `fsid` has been mounted before
//! and, if not, lays down the tables and the root directory.

use crate::errno::GatewayError;
use crate::gateway::{Gateway, NewInode};
use crate::model::{FileKind, ROOT_INODE};

/// The resolved header — `blocksize`/`capacity` either just persisted, or
/// read back from a prior mount (which always wins over the command line,
/// per `spec.md` §4.2 step 3).
#[derive(Debug, Clone, Copy)]
pub struct Bootstrapped {
	pub blocksize: i64,
	pub capacity: i64,
}

/// Runs the Schema & Bootstrap sequence described in `spec.md` §4.2 /
/// `SPEC_FULL.md` §4.2: probe for the header row; create tables and the
/// root directory on first mount; otherwise defer to the stored values.
pub fn bootstrap(
	gateway: &mut dyn Gateway,
	fsid: &str,
	requested_blocksize: i64,
	requested_capacity: i64,
	uid: u32,
	gid: u32,
	now_ns: i64,
) -> Result<Bootstrapped, GatewayError> {
	gateway.ensure_schema()?;

	if let Some(header) = gateway.header(fsid)? {
		return Ok(Bootstrapped {
			blocksize: header.blocksize,
			capacity: header.capacity,
		});
	}

	gateway.insert_header(fsid, requested_blocksize, requested_capacity)?;

	let root_mode = FileKind::Directory.type_bits() | 0o755;
	gateway.insert_inode(
		fsid,
		ROOT_INODE,
		&NewInode {
			mode: root_mode as i32,
			uid: uid as i32,
			gid: gid as i32,
			target: None,
			rdev: 0,
			atime_ns: now_ns,
			mtime_ns: now_ns,
			ctime_ns: now_ns,
		},
	)?;
	gateway.insert_dirent(fsid, ROOT_INODE, "..", ROOT_INODE)?;

	Ok(Bootstrapped {
		blocksize: requested_blocksize,
		capacity: requested_capacity,
	})
}
