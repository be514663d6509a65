//! The mutable, on-disk-backed test case that strategies reduce.

use atom::Atom;
use atomizer::Atomizer;
use error;
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A snapshot of a `Testcase`'s reducible region, usable only with
/// `Testcase::restore`.
///
/// A snapshot could be just the removed slice plus its position instead
/// of a full copy, but test cases reduced by this engine are small enough
/// in practice that the full-vector copy here is not a bottleneck.
#[derive(Clone, Debug)]
pub struct Snapshot {
    segments: Vec<Vec<u8>>,
    parts: Vec<Atom>,
}

/// A test case: a fixed prefix, a reducible sequence of atoms, and a fixed
/// suffix, backed by a file on disk that is authoritative between oracle
/// calls.
///
/// Internally, `before` and `after` are just the first and last entries of
/// `segments`, a vector of `parts.len() + 1` literal byte runs interleaved
/// with the atoms (see the `atomizer` module docs). This covers the
/// JsStr and Attribute atomizers, whose reducible region is interleaved
/// with segment text, with the same code path as the simpler atomizers.
#[derive(Debug)]
pub struct Testcase {
    path: PathBuf,
    segments: Vec<Vec<u8>>,
    parts: Vec<Atom>,
}

impl Testcase {
    /// Load and atomize the file at `path` with the given `atomizer`.
    pub fn load<P: AsRef<Path>>(path: P, atomizer: &Atomizer) -> error::Result<Testcase> {
        use std::io::Read;

        let path = path.as_ref().to_path_buf();
        let mut contents = Vec::new();
        fs::File::open(&path)
            .and_then(|mut f| f.read_to_end(&mut contents))
            .map_err(error::Error::LoadIo)?;

        let (segments, parts) = atomizer.atomize(&contents)?;
        if parts.is_empty() {
            return Err(error::Error::EmptyReducibleRegion);
        }

        Ok(Testcase {
            path,
            segments,
            parts,
        })
    }

    /// The path this test case is persisted at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The number of atoms in the reducible region.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Is the reducible region empty?
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The fixed prefix that is never removed.
    pub fn before(&self) -> &[u8] {
        &self.segments[0]
    }

    /// The fixed suffix that is never removed.
    pub fn after(&self) -> &[u8] {
        self.segments.last().expect("segments is never empty")
    }

    /// The total length, in bytes, of the current serialized test case.
    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum::<usize>()
            + self.parts.iter().map(|a| a.len()).sum::<usize>()
    }

    /// Borrow the current atoms, for strategies that need to inspect
    /// contents (e.g. to find matched brackets).
    pub fn parts(&self) -> &[Atom] {
        &self.parts
    }

    /// Serialize `before || parts || after` into a single buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        out.extend(&self.segments[0]);
        for (atom, seg) in self.parts.iter().zip(&self.segments[1..]) {
            out.extend(atom.bytes());
            out.extend(seg);
        }
        out
    }

    /// Atomically write the current serialized test case to `self.path()`:
    /// write to a sibling temp file, then rename over the original. On
    /// failure, the previous on-disk file is left intact.
    pub fn save(&self) -> error::Result<()> {
        let contents = self.serialize();

        let tmp_path = self.path.with_extension("lithium-tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(&contents)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Delete the atoms in `range` from the reducible region. Indices at or
    /// beyond `range.end` shift down by `range.len()`.
    ///
    /// The two segments bordering the removed atoms are concatenated into
    /// one; segments strictly between two removed atoms are interior to the
    /// deleted span and are dropped along with their neighbors, so segment
    /// text that belongs to the surviving atoms is never lost.
    pub fn remove(&mut self, range: Range<usize>) {
        assert!(range.end <= self.parts.len());
        assert!(range.start <= range.end);

        if range.start == range.end {
            return;
        }

        let mut merged = ::std::mem::replace(&mut self.segments[range.start], Vec::new());
        merged.extend(self.segments[range.end].iter().cloned());
        self.segments.splice(range.start..=range.end, vec![merged]);
        self.parts.splice(range.clone(), ::std::iter::empty());
    }

    /// Capture the current reducible region for a later `restore`.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            segments: self.segments.clone(),
            parts: self.parts.clone(),
        }
    }

    /// Replace the reducible region with a previously captured snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.segments = snapshot.segments;
        self.parts = snapshot.parts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomizer::Line;

    fn write_temp(contents: &[u8]) -> ::tempdir::TempDir {
        let dir = ::tempdir::TempDir::new("lithium-test-case").unwrap();
        let path = dir.path().join("testcase");
        fs::File::create(&path).unwrap().write_all(contents).unwrap();
        dir
    }

    #[test]
    fn load_and_serialize_round_trip() {
        let contents = b"A\nB\nC\nD\n";
        let dir = write_temp(contents);
        let tc = Testcase::load(dir.path().join("testcase"), &Line).unwrap();
        assert_eq!(tc.len(), 4);
        assert_eq!(tc.serialize(), contents);
    }

    #[test]
    fn remove_shifts_and_preserves_bytes() {
        let contents = b"A\nB\nC\nD\n";
        let dir = write_temp(contents);
        let mut tc = Testcase::load(dir.path().join("testcase"), &Line).unwrap();

        tc.remove(1..3); // remove "B\n" and "C\n"
        assert_eq!(tc.len(), 2);
        assert_eq!(tc.serialize(), b"A\nD\n");
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let contents = b"A\nB\nC\n";
        let dir = write_temp(contents);
        let mut tc = Testcase::load(dir.path().join("testcase"), &Line).unwrap();

        let snap = tc.snapshot();
        tc.remove(0..2);
        assert_eq!(tc.len(), 1);

        tc.restore(snap);
        assert_eq!(tc.len(), 3);
        assert_eq!(tc.serialize(), contents);
    }

    #[test]
    fn save_is_atomic_rename() {
        let contents = b"A\nB\n";
        let dir = write_temp(contents);
        let path = dir.path().join("testcase");
        let mut tc = Testcase::load(&path, &Line).unwrap();

        tc.remove(0..1);
        tc.save().unwrap();

        let mut on_disk = Vec::new();
        ::std::io::Read::read_to_end(&mut fs::File::open(&path).unwrap(), &mut on_disk).unwrap();
        assert_eq!(on_disk, b"B\n");
        assert!(!path.with_extension("lithium-tmp").exists());
    }

    #[test]
    fn empty_reducible_region_is_an_error() {
        let dir = write_temp(b"");
        let err = Testcase::load(dir.path().join("testcase"), &Line).unwrap_err();
        match err {
            error::Error::EmptyReducibleRegion => {}
            other => panic!("expected EmptyReducibleRegion, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_on_load_is_a_load_io_error() {
        let dir = ::tempdir::TempDir::new("lithium-test-case").unwrap();
        let err = Testcase::load(dir.path().join("does-not-exist"), &Line).unwrap_err();
        match err {
            error::Error::LoadIo(_) => {}
            other => panic!("expected LoadIo, got {:?}", other),
        }
        assert_eq!(::error::exit_code(&err), 2);
    }
}
