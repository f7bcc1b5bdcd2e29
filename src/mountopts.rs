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

//! Hand-parses the `-o key=value,key` mount-option string (`spec.md` §6).
//! No config-file crate is pulled in for this: the surface is a single
//! comma list, not a document.

use fuser::MountOption;

#[derive(Debug, thiserror::Error)]
pub enum MountOptError {
	#[error("missing required mount option: fsname")]
	MissingFsName,
	#[error("missing required mount option: blocksize")]
	MissingBlockSize,
	#[error("missing required mount option: fssize")]
	MissingFsSize,
	#[error("invalid blocksize: {0}")]
	InvalidBlockSize(String),
	#[error("invalid fssize: {0}")]
	InvalidFsSize(String),
	#[error("fssize must be at least 4 MiB after rounding, got {0} bytes")]
	FsSizeTooSmall(u64),
}

/// The parsed, validated mount-option set. `blocksize`/`capacity` are the
/// values *requested on the command line*; the Schema & Bootstrap step
/// (`schema.rs`) may override them with stored values from a prior mount.
#[derive(Debug, Clone)]
pub struct MountOpts {
	pub fsname: String,
	pub blocksize: u64,
	pub capacity: u64,
	/// Options neither recognized nor consumed above, passed through to
	/// the kernel bridge as bare `MountOption::CUSTOM` strings.
	pub passthrough: Vec<String>,
}

const MIN_FSSIZE: u64 = 4 * 1024 * 1024;

pub fn parse(raw: &str) -> Result<MountOpts, MountOptError> {
	let mut fsname = None;
	let mut blocksize = None;
	let mut fssize_raw = None;
	let mut passthrough = Vec::new();

	for token in raw.split(',').filter(|t| !t.is_empty()) {
		match token.split_once('=') {
			Some(("fsname", v)) => fsname = Some(v.to_string()),
			Some(("blocksize", v)) => blocksize = Some(v.to_string()),
			Some(("fssize", v)) => fssize_raw = Some(v.to_string()),
			_ => passthrough.push(token.to_string()),
		}
	}

	let fsname = fsname.ok_or(MountOptError::MissingFsName)?;
	let blocksize: u64 = blocksize
		.ok_or(MountOptError::MissingBlockSize)?
		.parse()
		.map_err(|_| MountOptError::InvalidBlockSize("not an integer".into()))?;
	let fssize_raw = fssize_raw.ok_or(MountOptError::MissingFsSize)?;
	let capacity = parse_fssize(&fssize_raw, blocksize)?;

	Ok(MountOpts {
		fsname,
		blocksize,
		capacity,
		passthrough,
	})
}

fn parse_fssize(raw: &str, blocksize: u64) -> Result<u64, MountOptError> {
	let raw = raw.trim();
	if raw.is_empty() {
		return Err(MountOptError::InvalidFsSize(raw.to_string()));
	}
	let (digits, unit) = raw.split_at(raw.len() - 1);
	let scale: u64 = match unit.to_ascii_lowercase().as_str() {
		"k" => 1024,
		"m" => 1024 * 1024,
		"g" => 1024 * 1024 * 1024,
		"t" => 1024 * 1024 * 1024 * 1024,
		_ => return Err(MountOptError::InvalidFsSize(raw.to_string())),
	};
	let n: u64 = digits
		.parse()
		.map_err(|_| MountOptError::InvalidFsSize(raw.to_string()))?;
	let bytes = n
		.checked_mul(scale)
		.ok_or_else(|| MountOptError::InvalidFsSize(raw.to_string()))?;
	let rounded = ((bytes + blocksize - 1) / blocksize) * blocksize;
	if rounded < MIN_FSSIZE {
		return Err(MountOptError::FsSizeTooSmall(rounded));
	}
	Ok(rounded)
}

/// Builds the full option list `fuser::mount2` is called with: the three
/// mount options the spec always sets, plus anything unrecognized in the
/// `-o` string passed through verbatim.
pub fn fuser_options(opts: &MountOpts) -> Vec<MountOption> {
	let mut options = vec![
		MountOption::FSName("udavfs3".to_string()),
		MountOption::DefaultPermissions,
		MountOption::AllowOther,
		// `fuser` 0.14 / FUSE3 dropped a `MountOption::NonEmpty` variant, so
		// the spec's always-on `nonempty` flag is passed through as a bare
		// custom option rather than silently dropped (DESIGN.md).
		MountOption::CUSTOM("nonempty".to_string()),
	];
	for raw in &opts.passthrough {
		options.push(MountOption::CUSTOM(raw.clone()));
	}
	options
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_required_options() {
		let opts = parse("fsname=myfs,blocksize=4096,fssize=1g").unwrap();
		assert_eq!(opts.fsname, "myfs");
		assert_eq!(opts.blocksize, 4096);
		assert_eq!(opts.capacity, 1024 * 1024 * 1024);
	}

	#[test]
	fn fssize_rounds_up_to_blocksize_multiple() {
		let opts = parse("fsname=f,blocksize=4096,fssize=1m").unwrap();
		// 1 MiB is already a multiple of 4096.
		assert_eq!(opts.capacity, 1024 * 1024);

		let opts = parse("fsname=f,blocksize=4000,fssize=1m").unwrap();
		assert_eq!(opts.capacity % 4000, 0);
		assert!(opts.capacity >= 1024 * 1024);
	}

	#[test]
	fn fssize_below_four_mebibytes_is_rejected() {
		let err = parse("fsname=f,blocksize=4096,fssize=1k").unwrap_err();
		assert!(matches!(err, MountOptError::FsSizeTooSmall(_)));
	}

	#[test]
	fn missing_fsname_is_an_error() {
		let err = parse("blocksize=4096,fssize=1g").unwrap_err();
		assert!(matches!(err, MountOptError::MissingFsName));
	}

	#[test]
	fn unrecognized_options_pass_through() {
		let opts = parse("fsname=f,blocksize=4096,fssize=1g,nonempty,ro").unwrap();
		assert_eq!(opts.passthrough, vec!["nonempty".to_string(), "ro".to_string()]);
	}
}
