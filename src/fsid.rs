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

//! Derives the `fsid` that scopes every row to one logical filesystem: the
//! 40-character lowercase hex SHA-1 digest of the user-supplied filesystem
//! name's UTF-8 bytes.

use sha1::{Digest, Sha1};

pub fn fsid_for_name(name: &str) -> String {
	let mut hasher = Sha1::new();
	hasher.update(name.as_bytes());
	let digest = hasher.finalize();
	let mut out = String::with_capacity(40);
	for byte in digest {
		out.push_str(&format!("{byte:02x}"));
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_known_sha1_digest() {
		// sha1("") == da39a3ee5e6b4b0d3255bfef95601890afd80709
		assert_eq!(fsid_for_name(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
	}

	#[test]
	fn is_forty_lowercase_hex_characters() {
		let id = fsid_for_name("my-filesystem");
		assert_eq!(id.len(), 40);
		assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn distinct_names_hash_differently() {
		assert_ne!(fsid_for_name("a"), fsid_for_name("b"));
	}
}
