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

//! The File-Body Engine's `read`/`write` primitives (`spec.md` §4.4). The
//! block-splicing arithmetic itself lives in [`crate::body`]; this module
//! is where it meets the gateway.

use crate::body::{block_range, logical_block_len};
use crate::errno::{Errno, UdavResult};
use crate::gateway::{Gateway, InodePatch};

use super::{now_ns, Store};

impl<G: Gateway> Store<G> {
	/// `read(inode, offset, length) -> bytes`.
	pub fn read(&mut self, inode_id: i64, offset: u64, length: u32) -> UdavResult<Vec<u8>> {
		let row = self.fetch_inode(inode_id)?;
		let size = row.size as u64;
		if offset >= size {
			return Ok(Vec::new());
		}
		let length = (length as u64).min(size - offset);
		if length == 0 {
			return Ok(Vec::new());
		}
		let blocksize = self.blocksize;
		let br = block_range(offset, length, blocksize);
		let rows = self
			.gateway
			.list_blocks(&self.fsid, inode_id, br.first_block as i64, br.last_block as i64)?;

		let mut out = Vec::with_capacity(length as usize);
		for b in br.first_block..=br.last_block {
			let stored = rows
				.iter()
				.find(|(no, _)| *no as u64 == b)
				.map(|(_, data)| data.clone())
				.unwrap_or_default();
			let lo = if b == br.first_block { br.start_idx as usize } else { 0 };
			let hi = if b == br.last_block {
				br.end_idx as usize
			} else {
				blocksize as usize
			};
			let mut padded = stored;
			if padded.len() < hi {
				padded.resize(hi, 0);
			}
			let lo = lo.min(padded.len());
			let hi = hi.min(padded.len());
			out.extend_from_slice(&padded[lo..hi]);
		}
		Ok(out)
	}

	/// `write(fh, offset, buf) -> bytes_written`.
	pub fn write(&mut self, inode_id: i64, offset: u64, buf: &[u8]) -> UdavResult<u32> {
		let row = self.fetch_inode(inode_id)?;
		let size = row.size as u64;
		self.write_bytes(inode_id, size, offset, buf)?;
		let new_size = size.max(offset + buf.len() as u64);
		let now = now_ns();
		self.gateway.update_inode(
			&self.fsid,
			inode_id,
			&InodePatch {
				size: if new_size > size { Some(new_size as i64) } else { None },
				mtime_ns: Some(now),
				ctime_ns: Some(now),
				..Default::default()
			},
		)?;
		Ok(buf.len() as u32)
	}

	/// The block-splicing loop shared by `write()` and the grow path of
	/// `truncate-via-setattr` (which calls this with a zero-filled buffer
	/// at the current end of file — see `setattr.rs`). Persists blocks
	/// only; callers own updating the inode's size and timestamps.
	pub(super) fn write_bytes(&mut self, inode_id: i64, size: u64, offset: u64, buf: &[u8]) -> UdavResult<()> {
		if buf.is_empty() {
			return Ok(());
		}
		let blocksize = self.blocksize;
		let br = block_range(offset, buf.len() as u64, blocksize);
		let new_size = size.max(offset + buf.len() as u64);
		let file_last_block = if new_size == 0 { 0 } else { (new_size + blocksize - 1) / blocksize - 1 };

		let mut cursor = 0usize;
		for b in br.first_block..=br.last_block {
			let is_first = b == br.first_block;
			let is_last = b == br.last_block;
			let existing = self.gateway.get_block(&self.fsid, inode_id, b as i64)?;
			let existed = existing.is_some();
			let mut old_full = existing.unwrap_or_default();
			if (old_full.len() as u64) < blocksize {
				old_full.resize(blocksize as usize, 0);
			}

			let start_idx = br.start_idx as usize;
			let end_idx = br.end_idx as usize;
			let mut new_content: Vec<u8>;
			if is_first && is_last {
				let take = end_idx - start_idx;
				new_content = old_full[..start_idx].to_vec();
				new_content.extend_from_slice(&buf[cursor..cursor + take]);
				new_content.extend_from_slice(&old_full[end_idx..]);
				cursor += take;
			} else if is_first {
				let take = blocksize as usize - start_idx;
				new_content = old_full[..start_idx].to_vec();
				new_content.extend_from_slice(&buf[cursor..cursor + take]);
				cursor += take;
			} else if is_last {
				let take = end_idx;
				new_content = buf[cursor..cursor + take].to_vec();
				new_content.extend_from_slice(&old_full[end_idx..]);
				cursor += take;
			} else {
				let take = blocksize as usize;
				new_content = buf[cursor..cursor + take].to_vec();
				cursor += take;
			}

			// If this block ends up as the new final block of the file,
			// trim it to the length the size invariant requires (spec.md
			// §3: "the last block ... contains exactly S mod blocksize
			// bytes") rather than leaving a zero-padded tail.
			if b == file_last_block {
				let logical_len = logical_block_len(new_size, b, blocksize) as usize;
				new_content.truncate(logical_len);
			}

			if existed {
				self.gateway.update_block(&self.fsid, inode_id, b as i64, &new_content)?;
			} else {
				self.gateway.insert_block(&self.fsid, inode_id, b as i64, &new_content)?;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gateway::mem::MemGateway;
	use crate::model::{Context, ROOT_INODE};
	use crate::schema::bootstrap;
	use crate::store::Store;

	fn new_store(blocksize: u64) -> Store<MemGateway> {
		let mut gw = MemGateway::new();
		bootstrap(&mut gw, "fs1", blocksize as i64, 1 << 30, 0, 0, 1).unwrap();
		Store::new(gw, "fs1".to_string(), blocksize, 1 << 30)
	}

	fn new_file(store: &mut Store<MemGateway>, name: &str) -> i64 {
		let ctx = Context { uid: 0, gid: 0 };
		let (attr, h) = store.create(ctx, ROOT_INODE, name, 0o644).unwrap();
		store.release(h).unwrap();
		attr.inode_id
	}

	#[test]
	fn write_then_read_round_trips_within_one_block() {
		let mut store = new_store(4096);
		let ino = new_file(&mut store, "f");
		let n = store.write(ino, 0, b"hello").unwrap();
		assert_eq!(n, 5);
		assert_eq!(store.read(ino, 0, 5).unwrap(), b"hello");
		assert_eq!(store.getattr(ino).unwrap().size, 5);
	}

	#[test]
	fn write_crossing_a_boundary_round_trips() {
		let mut store = new_store(16);
		let ino = new_file(&mut store, "f");
		let data: Vec<u8> = (0u8..40).collect();
		store.write(ino, 5, &data).unwrap();
		assert_eq!(store.read(ino, 5, 40).unwrap(), data);
		assert_eq!(store.getattr(ino).unwrap().size, 45);
	}

	#[test]
	fn grow_across_block_boundary_zero_fills() {
		let mut store = new_store(4096);
		let ino = new_file(&mut store, "f");
		store.write(ino, 4090, b"0123456789").unwrap();
		let attr = store.getattr(ino).unwrap();
		assert_eq!(attr.size, 4100);
		let data = store.read(ino, 0, 4100).unwrap();
		assert_eq!(&data[..4090], &vec![0u8; 4090][..]);
		assert_eq!(&data[4090..], b"0123456789");
	}

	#[test]
	fn reads_past_eof_are_empty_and_straddling_reads_clamp() {
		let mut store = new_store(4096);
		let ino = new_file(&mut store, "f");
		store.write(ino, 0, b"hello").unwrap();
		assert_eq!(store.read(ino, 5, 10).unwrap(), Vec::<u8>::new());
		assert_eq!(store.read(ino, 3, 10).unwrap(), b"lo");
	}

	#[test]
	fn write_then_setattr_size_matches_write_len_round_trip_law() {
		let mut store = new_store(4096);
		let ino = new_file(&mut store, "f");
		store.write(ino, 0, b"abcdef").unwrap();
		use crate::model::SetattrRequest;
		store
			.setattr(ino, SetattrRequest { size: Some(6), ..Default::default() })
			.unwrap();
		assert_eq!(store.read(ino, 0, 6).unwrap(), b"abcdef");
		assert_eq!(store.getattr(ino).unwrap().size, 6);
	}
}
