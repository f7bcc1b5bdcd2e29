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

//! `udavfs3 "<connection string>" <mountpoint> -o <options>` — parses the
//! invocation (`spec.md` §6), connects to Postgres over TLS, runs Schema &
//! Bootstrap, daemonizes, and enters the `fuser` main loop.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context as _};
use native_tls::TlsConnector;
use nix::unistd::{getgid, getuid};
use postgres_native_tls::MakeTlsConnector;

use udavfs3::fs::UdavFs;
use udavfs3::fsid::fsid_for_name;
use udavfs3::gateway::pg::PgGateway;
use udavfs3::mountopts::{self, MountOpts};
use udavfs3::schema::bootstrap;
use udavfs3::store::Store;

fn usage(program: &str) -> String {
	format!("usage: {program} \"<database connection string>\" <mountpoint> -o <option>[,<option>...]")
}

/// Forces `sslmode=require` onto a Postgres connection string, whichever of
/// the two accepted syntaxes (`postgresql://...` URI, or space-separated
/// `key=value` pairs) the caller supplied.
fn force_sslmode_require(conn_str: &str) -> String {
	if conn_str.contains("sslmode=") {
		return conn_str.to_string();
	}
	if conn_str.starts_with("postgres://") || conn_str.starts_with("postgresql://") {
		let sep = if conn_str.contains('?') { '&' } else { '?' };
		format!("{conn_str}{sep}sslmode=require")
	} else {
		format!("{conn_str} sslmode=require")
	}
}

fn now_ns() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_nanos() as i64
}

fn run() -> anyhow::Result<()> {
	let args: Vec<String> = std::env::args().collect();
	let program = args.first().cloned().unwrap_or_else(|| "udavfs3".to_string());
	if args.len() != 5 || args[3] != "-o" {
		bail!(usage(&program));
	}
	let conn_str = args[1].clone();
	let mountpoint = args[2].clone();
	let opt_str = args[4].clone();

	let opts: MountOpts = mountopts::parse(&opt_str).context("invalid mount options")?;
	let fsid = fsid_for_name(&opts.fsname);

	let tls = TlsConnector::builder()
		.build()
		.context("failed to build TLS connector")?;
	let connector = MakeTlsConnector::new(tls);
	let conn_str = force_sslmode_require(&conn_str);
	let mut gateway = PgGateway::connect(&conn_str, connector).context("failed to connect to database")?;

	let uid = getuid().as_raw();
	let gid = getgid().as_raw();
	let bootstrapped = bootstrap(
		&mut gateway,
		&fsid,
		opts.blocksize as i64,
		opts.capacity as i64,
		uid,
		gid,
		now_ns(),
	)
	.map_err(|e| anyhow::anyhow!("bootstrap failed: {e}"))?;

	let store = Store::new(
		gateway,
		fsid,
		bootstrapped.blocksize as u64,
		bootstrapped.capacity as u64,
	);
	let filesystem = UdavFs::new(store);
	let fuser_options = mountopts::fuser_options(&opts);

	udavfs3::daemon::daemonize().context("failed to daemonize")?;

	log::info!("mounting {mountpoint} (fsname={})", opts.fsname);
	// `fuser::mount2` blocks until the filesystem is unmounted or the
	// kernel session errors out; there is no separate "close the bridge
	// without unmounting" call in its API, so an error here is simply
	// logged and re-raised without attempting `fuser::unmount` (`spec.md`
	// §6's "attempts to close the bridge without unmounting and
	// re-raises" — see `SPEC_FULL.md` §6 for the full justification).
	if let Err(e) = fuser::mount2(filesystem, &mountpoint, &fuser_options) {
		log::error!("fuse session ended with an error: {e}");
		return Err(e).context("fuse main loop failed");
	}
	Ok(())
}

fn main() {
	env_logger::init();
	if let Err(e) = run() {
		eprintln!("{e:#}");
		std::process::exit(1);
	}
}
