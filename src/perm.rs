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

//! Classic owner/group/other mode-bit permission triage, shared by
//! `access()` and anything else that needs to ask "can this caller do X".

/// Checks `want` (some combination of `libc::R_OK | W_OK | X_OK`) against
/// `mode`'s permission bits, picking the owner/group/other triad the way
/// `access(2)` does: owner bits if the caller's uid matches, else group
/// bits if the gid matches, else other bits.
pub fn mode_allows(mode: u32, owner_uid: u32, owner_gid: u32, ctx_uid: u32, ctx_gid: u32, want: u32) -> bool {
	// The superuser always passes; FUSE's `default_permissions` would
	// normally short-circuit this in the kernel, but `access()` can still
	// be asked to check explicitly.
	if ctx_uid == 0 {
		return true;
	}
	let shift = if ctx_uid == owner_uid {
		6
	} else if ctx_gid == owner_gid {
		3
	} else {
		0
	};
	let bits = (mode >> shift) & 0o7;
	let want = want & 0o7;
	bits & want == want
}
