//! Streaming digest engine: drives any non-empty subset of {SHA-1, SHA-256,
//! MD5} over a file without ever buffering more than one chunk.

use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;
use sha1::Digest as _;

use crate::model::Options;

/// Which algorithms are active for this run. Constant for the run's lifetime
/// (§3, invariant I1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestSelection {
    pub sha1: bool,
    pub sha256: bool,
    pub md5: bool,
}

impl DigestSelection {
    pub fn from_options(options: &Options) -> Self {
        DigestSelection {
            sha1: options.enable_sha1,
            sha256: options.enable_sha256,
            md5: options.enable_md5,
        }
    }
}

/// A finalized (sha1, sha256, md5) triple. Absent slots are `None`, never
/// the empty string (invariant I3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestTriple {
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub md5: Option<String>,
}

/// One in-progress hash computation per selected algorithm. Consumed by
/// `finalize`; callers must obtain a fresh engine for the next file.
pub struct DigestEngine {
    sha1: Option<Sha1>,
    sha256: Option<Sha256>,
    md5: Option<Md5>,
}

impl DigestEngine {
    pub fn new(selection: DigestSelection) -> Self {
        DigestEngine {
            sha1: selection.sha1.then(Sha1::new),
            sha256: selection.sha256.then(Sha256::new),
            md5: selection.md5.then(Md5::new),
        }
    }

    /// Feed a chunk to every selected algorithm. Tolerates zero-length chunks.
    pub fn update(&mut self, chunk: &[u8]) {
        if let Some(h) = self.sha1.as_mut() {
            h.update(chunk);
        }
        if let Some(h) = self.sha256.as_mut() {
            h.update(chunk);
        }
        if let Some(h) = self.md5.as_mut() {
            h.update(chunk);
        }
    }

    pub fn finalize(self) -> DigestTriple {
        DigestTriple {
            sha1: self.sha1.map(|h| hex_lower(&h.finalize())),
            sha256: self.sha256.map(|h| hex_lower(&h.finalize())),
            md5: self.md5.map(|h| hex_lower(&h.finalize())),
        }
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{:02x}", b).expect("writing to a String cannot fail");
    }
    out
}

/// Stream `path` through a fresh [`DigestEngine`] in `chunk_size`-sized reads
/// until EOF. No whole-file buffering (§4.1).
pub fn hash_file(path: &Path, selection: DigestSelection, chunk_size: usize) -> io::Result<DigestTriple> {
    let mut file = std::fs::File::open(path)?;
    let mut engine = DigestEngine::new(selection);
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        engine.update(&buf[..n]);
    }
    Ok(engine.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_for_abc() {
        let sel = DigestSelection { sha1: true, sha256: true, md5: true };
        let mut engine = DigestEngine::new(sel);
        engine.update(b"abc");
        let triple = engine.finalize();
        assert_eq!(triple.sha1.as_deref(), Some("a9993e364706816aba3e25717850c26c9cd0d89d"));
        assert_eq!(
            triple.sha256.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(triple.md5.as_deref(), Some("900150983cd24fb0d6963f7d28e17f72"));
    }

    #[test]
    fn absent_slots_are_none_not_empty() {
        let sel = DigestSelection { sha1: true, sha256: false, md5: false };
        let mut engine = DigestEngine::new(sel);
        engine.update(b"x");
        let triple = engine.finalize();
        assert!(triple.sha1.is_some());
        assert_eq!(triple.sha256, None);
        assert_eq!(triple.md5, None);
    }

    #[test]
    fn chunk_size_does_not_affect_digest() {
        let data = b"the quick brown fox jumps over the lazy dog, repeated a few times to exceed one byte";
        let sel = DigestSelection { sha1: true, sha256: false, md5: false };

        let mut one_byte_at_a_time = DigestEngine::new(sel);
        for byte in data {
            one_byte_at_a_time.update(std::slice::from_ref(byte));
        }

        let mut whole_chunk = DigestEngine::new(sel);
        whole_chunk.update(data);

        assert_eq!(one_byte_at_a_time.finalize(), whole_chunk.finalize());
    }

    #[test]
    fn zero_length_chunk_is_tolerated() {
        let sel = DigestSelection { sha1: true, sha256: false, md5: false };
        let mut engine = DigestEngine::new(sel);
        engine.update(b"");
        engine.update(b"data");
        engine.update(b"");
        let triple = engine.finalize();
        assert!(triple.sha1.is_some());
    }
}
