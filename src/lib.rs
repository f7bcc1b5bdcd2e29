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

//! UdavFS: a POSIX filesystem whose inode table, directory structure, and
//! file contents live in a Postgres-compatible database, reached through
//! FUSE. See `SPEC_FULL.md` for the full design; in short, four layers,
//! leaves first:
//!
//! - [`gateway`]: the Storage Gateway, a typed query vocabulary over a SQL
//!   connection.
//! - [`schema`]: Schema & Bootstrap, first-mount table/row creation.
//! - [`store`]: the Inode & Directory Store and the File-Body Engine.
//! - [`fs`]: the `fuser::Filesystem` adapter binding kernel upcalls to
//!   `store`.
//!
//! [`daemon`], [`mountopts`], and [`fsid`] are the process-level ambient
//! concerns (`spec.md` §6): daemonization, mount-option parsing, and the
//! `fsid` derivation.

pub mod body;
pub mod daemon;
pub mod errno;
pub mod fs;
pub mod fsid;
pub mod gateway;
pub mod model;
pub mod mountopts;
pub mod opencount;
pub mod perm;
pub mod schema;
pub mod store;
