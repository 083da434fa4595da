//! Byte-range access to input resources

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A resource of known size that can be read in arbitrary byte ranges
pub trait ByteSource {
    /// Display name, usually the file name
    fn name(&self) -> &str;

    /// Total size in bytes
    fn size(&self) -> u64;

    /// Read up to `len` bytes starting at `offset`. Fewer bytes are returned
    /// only at the end of the resource.
    fn read_range(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>>;
}

/// A file on the local filesystem
#[derive(Debug)]
pub struct FileSource {
    name: String,
    file: File,
    size: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            file,
            size,
        })
    }
}

impl ByteSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len);
        (&mut self.file).take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Bytes already held in memory, e.g. content handed over by a remote collaborator
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl ByteSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_range(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        let start = (offset as usize).min(self.bytes.len());
        let end = start.saturating_add(len).min(self.bytes.len());
        Ok(self.bytes[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_memory_source_ranges() {
        let mut source = MemorySource::new("mem.txt", "hello world");
        assert_eq!(source.size(), 11);
        assert_eq!(source.read_range(0, 5).unwrap(), b"hello");
        assert_eq!(source.read_range(6, 100).unwrap(), b"world");
        assert!(source.read_range(50, 5).unwrap().is_empty());
    }

    #[test]
    fn test_file_source_ranges() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("abcdef".as_bytes()).unwrap();
        file.flush().unwrap();

        let mut source = FileSource::open(file.path()).unwrap();
        assert_eq!(source.size(), 6);
        assert_eq!(source.read_range(2, 3).unwrap(), b"cde");
        assert_eq!(source.read_range(4, 10).unwrap(), b"ef");
        assert_eq!(source.read_range(0, 1).unwrap(), b"a");
    }
}
