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

//! Shared data types: the inode attribute record, the file-type/mode
//! helpers, and the caller context every store operation is given.

/// The reserved inode id of the root directory.
pub const ROOT_INODE: i64 = 1;

/// The caller's identity, as supplied by the kernel bridge for every
/// operation that needs to evaluate permissions.
#[derive(Debug, Clone, Copy)]
pub struct Context {
	pub uid: u32,
	pub gid: u32,
}

/// The file type encoded in the high bits of `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
	Directory,
	Regular,
	Symlink,
	Fifo,
	CharDevice,
	BlockDevice,
	Socket,
}

impl FileKind {
	/// The `S_IF*` bits for this kind, suitable for OR-ing into a mode.
	pub fn type_bits(self) -> u32 {
		(match self {
			Self::Directory => libc::S_IFDIR,
			Self::Regular => libc::S_IFREG,
			Self::Symlink => libc::S_IFLNK,
			Self::Fifo => libc::S_IFIFO,
			Self::CharDevice => libc::S_IFCHR,
			Self::BlockDevice => libc::S_IFBLK,
			Self::Socket => libc::S_IFSOCK,
		}) as u32
	}

	/// Recovers the file type from a full mode word, if it names one of the
	/// kinds this filesystem can hold.
	pub fn from_mode(mode: u32) -> Option<Self> {
		match mode & (libc::S_IFMT as u32) {
			m if m == libc::S_IFDIR as u32 => Some(Self::Directory),
			m if m == libc::S_IFREG as u32 => Some(Self::Regular),
			m if m == libc::S_IFLNK as u32 => Some(Self::Symlink),
			m if m == libc::S_IFIFO as u32 => Some(Self::Fifo),
			m if m == libc::S_IFCHR as u32 => Some(Self::CharDevice),
			m if m == libc::S_IFBLK as u32 => Some(Self::BlockDevice),
			m if m == libc::S_IFSOCK as u32 => Some(Self::Socket),
			_ => None,
		}
	}
}

/// A full inode attribute record, as returned by `lookup`/`getattr` and
/// every operation that yields one as a side effect.
#[derive(Debug, Clone)]
pub struct Attr {
	pub inode_id: i64,
	pub mode: u32,
	pub uid: u32,
	pub gid: u32,
	pub rdev: u32,
	pub size: u64,
	/// Number of directory entries pointing at this inode.
	pub nlink: u32,
	/// Number of blocks currently stored for this inode.
	pub blocks: u64,
	pub atime_ns: i64,
	pub mtime_ns: i64,
	pub ctime_ns: i64,
}

impl Attr {
	pub fn kind(&self) -> Option<FileKind> {
		FileKind::from_mode(self.mode)
	}
}

/// Statistics returned by `statfs`.
#[derive(Debug, Clone, Copy)]
pub struct Statfs {
	pub blocksize: u64,
	pub frsize: u64,
	pub blocks: u64,
	pub bfree: u64,
	pub bavail: u64,
	pub files: u64,
	pub ffree: u64,
}

/// The subset of `setattr` fields a caller may flag for update. `rdev` and
/// `ctime_ns` are always applied when present (see `spec.md` §4.3); the
/// rest are only applied when the corresponding `Option` is `Some`.
#[derive(Debug, Clone, Default)]
pub struct SetattrRequest {
	pub mode: Option<u32>,
	pub uid: Option<u32>,
	pub gid: Option<u32>,
	pub size: Option<u64>,
	pub atime_ns: Option<i64>,
	pub mtime_ns: Option<i64>,
	pub rdev: Option<u32>,
}
