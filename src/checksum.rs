//! Checksum and hashing utilities
//!
//! Manifests carry md5 fingerprints because deployed clients compare against
//! them; md5 is used here for change detection only, never for integrity
//! against an adversary.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const HASH_CHUNK: usize = 64 * 1024;

/// Hex md5 of an in-memory buffer
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Hex md5 of a file's content, read in 64KB chunks
pub fn md5_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    md5_reader(&mut file)
}

pub fn md5_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut ctx = md5::Context::new();
    let mut buffer = vec![0u8; HASH_CHUNK];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buffer[..n]);
    }
    Ok(format!("{:x}", ctx.compute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_md5_known_vectors() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"Hello, world!\n"), "746308829575e17c3331bbcb00c0898b");
    }

    #[test]
    fn test_md5_file_matches_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big.bin");
        // Cross several chunk boundaries
        let data: Vec<u8> = (0..(HASH_CHUNK * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(md5_file(&path).unwrap(), md5_hex(&data));
    }

    #[test]
    fn test_md5_file_missing() {
        let err = md5_file(Path::new("/this/file/does/not/exist")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
