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

//! The process-local open-count map that keeps orphan inodes (link count
//! zero, still held open) alive. Rebuilt empty on every mount (`spec.md`
//! §3 "In-memory state").

use std::collections::HashMap;
use std::sync::Mutex;

/// Maps `inode_id` to its outstanding open-handle count. Guarded by a
/// mutex even though `fuser::mount2` drives a single-threaded loop: the
/// invariants in `spec.md` §5 are specified as if concurrent delivery were
/// possible, and a multi-threaded session is a one-line change away.
#[derive(Default)]
pub struct OpenCountTable {
	counts: Mutex<HashMap<i64, u32>>,
}

impl OpenCountTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Increments the open count for `inode_id`, creating an entry at 1 if
	/// there was none.
	pub fn open(&self, inode_id: i64) {
		let mut counts = self.counts.lock().unwrap();
		*counts.entry(inode_id).or_insert(0) += 1;
	}

	/// Decrements the open count for `inode_id`, removing the entry once it
	/// reaches zero. Returns the count remaining after the decrement (0 if
	/// the entry was removed or didn't exist).
	pub fn release(&self, inode_id: i64) -> u32 {
		let mut counts = self.counts.lock().unwrap();
		match counts.get_mut(&inode_id) {
			Some(n) if *n > 1 => {
				*n -= 1;
				*n
			}
			Some(_) => {
				counts.remove(&inode_id);
				0
			}
			None => 0,
		}
	}

	/// Whether any handle currently references `inode_id`.
	pub fn is_open(&self, inode_id: i64) -> bool {
		self.counts.lock().unwrap().contains_key(&inode_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn open_then_release_to_zero_removes_entry() {
		let t = OpenCountTable::new();
		t.open(7);
		assert!(t.is_open(7));
		assert_eq!(t.release(7), 0);
		assert!(!t.is_open(7));
	}

	#[test]
	fn multiple_opens_require_matching_releases() {
		let t = OpenCountTable::new();
		t.open(7);
		t.open(7);
		assert_eq!(t.release(7), 1);
		assert!(t.is_open(7));
		assert_eq!(t.release(7), 0);
		assert!(!t.is_open(7));
	}

	#[test]
	fn release_of_unknown_inode_is_a_harmless_no_op() {
		let t = OpenCountTable::new();
		assert_eq!(t.release(42), 0);
		assert!(!t.is_open(42));
	}
}
