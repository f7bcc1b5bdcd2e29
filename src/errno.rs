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

//! The POSIX errors the core can raise, and their mapping onto the errno
//! values the kernel bridge expects back.

/// The result type used throughout the core.
pub type UdavResult<T> = Result<T, Errno>;

/// A POSIX error surfaced through the kernel bridge's error mechanism.
///
/// Only the errno values this crate's operation vocabulary can actually
/// produce are named explicitly; anything else collapses into `Io`.
#[derive(Debug, thiserror::Error)]
pub enum Errno {
	/// Name not found.
	#[error("no such file or directory")]
	NoEnt,
	/// `unlink` target is a directory.
	#[error("is a directory")]
	IsDir,
	/// `rmdir` target is not a directory.
	#[error("not a directory")]
	NotDir,
	/// Directory not empty (rmdir, or rename displacing a non-empty directory).
	#[error("directory not empty")]
	NotEmpty,
	/// Operation on an orphaned parent, or otherwise malformed arguments.
	#[error("invalid argument")]
	Inval,
	/// A uniqueness constraint on `(parent, name)` was violated.
	#[error("file exists")]
	Exist,
	/// Caller lacks the permission bits required for the operation.
	#[error("permission denied")]
	Perm,
	/// A database-layer failure: connectivity or an unexpected constraint
	/// violation that isn't the `(parent, name)` uniqueness case above.
	#[error("i/o error: {0}")]
	Io(String),
}

impl Errno {
	/// Returns the raw `errno` value the kernel bridge reply functions want.
	pub fn raw(&self) -> i32 {
		match self {
			Self::NoEnt => libc::ENOENT,
			Self::IsDir => libc::EISDIR,
			Self::NotDir => libc::ENOTDIR,
			Self::NotEmpty => libc::ENOTEMPTY,
			Self::Inval => libc::EINVAL,
			Self::Exist => libc::EEXIST,
			Self::Perm => libc::EPERM,
			Self::Io(_) => libc::EIO,
		}
	}
}

/// An internal invariant violation on a gateway fetch: either no row matched
/// a uniquely-keyed query (`NoSuchRow`), used as the lookup-miss signal, or
/// more than one row matched (`NotUnique`), which should never happen under
/// correct operation and is never expected.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
	#[error("no such row")]
	NoSuchRow,
	#[error("row is not unique")]
	NotUnique,
	#[error("unique constraint violated")]
	Conflict,
	#[error("backend error: {0}")]
	Backend(String),
}

impl From<GatewayError> for Errno {
	fn from(e: GatewayError) -> Self {
		match e {
			// A lookup miss against a uniquely-keyed query is reported as
			// ENOENT by the callers that use `NoSuchRow` as their miss
			// signal; callers that treat absence as "ok, nothing there"
			// handle `NoSuchRow` themselves before it ever reaches here.
			GatewayError::NoSuchRow => Errno::NoEnt,
			GatewayError::Conflict => Errno::Exist,
			GatewayError::NotUnique => {
				Errno::Io("internal invariant violated: row is not unique".into())
			}
			GatewayError::Backend(msg) => Errno::Io(msg),
		}
	}
}

