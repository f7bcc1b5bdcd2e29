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

//! Double-fork daemonization: detach from the controlling terminal, chdir
//! to `/`, reset the umask, and redirect stdio to `/dev/null` before
//! entering the kernel-bridge main loop (`spec.md` §6).

use std::os::fd::IntoRawFd;
use std::path::Path;

use nix::unistd::{chdir, close, dup2, fork, setsid, ForkResult};

/// Forks twice and returns only in the final grandchild process, fully
/// detached. The two intermediate processes (original and first child)
/// exit immediately; `std::process::exit` in the parent legs never runs
/// any `Drop` impls, matching the teacher's `exit`-on-fork-success idiom.
pub fn daemonize() -> anyhow::Result<()> {
	// First fork: the original process exits so the child is reparented to
	// init/systemd and is guaranteed not to be a process group leader.
	match unsafe { fork() }? {
		ForkResult::Parent { .. } => std::process::exit(0),
		ForkResult::Child => {}
	}

	setsid()?;

	// Second fork: prevents the daemon from ever reacquiring a controlling
	// terminal.
	match unsafe { fork() }? {
		ForkResult::Parent { .. } => std::process::exit(0),
		ForkResult::Child => {}
	}

	chdir(Path::new("/"))?;
	// SAFETY: umask(2) has no failure mode and takes no pointers.
	unsafe {
		libc::umask(0o022);
	}
	redirect_stdio_to_dev_null()?;
	Ok(())
}

fn redirect_stdio_to_dev_null() -> anyhow::Result<()> {
	let dev_null = std::fs::OpenOptions::new().read(true).write(true).open("/dev/null")?;
	// Take ownership of the fd so `File`'s `Drop` doesn't also close it.
	let fd = dev_null.into_raw_fd();
	for target in [0, 1, 2] {
		dup2(fd, target)?;
	}
	if fd > 2 {
		close(fd)?;
	}
	Ok(())
}
