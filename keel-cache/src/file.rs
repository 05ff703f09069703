use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{CacheError, CacheStore};

/// Filesystem cache store: one file per key under `dir`.
///
/// Keys are percent-encoded into file names; a leading `.` is encoded too, so
/// no key can name the store directory, its parent or a hidden file. Writes go to a temporary file
/// first and are renamed into place, so a reader never sees a torn entry.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(encode_key(key)))
    }

    fn entries(&self) -> Result<Vec<(String, PathBuf)>, CacheError> {
        let mut out = Vec::new();
        let read = fs::read_dir(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        for entry in read {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(key) = decode_key(name) {
                out.push((key, entry.path()));
            }
        }
        Ok(out)
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Option<Bytes> {
        let path = self.path_for(key).ok()?;
        fs::read(path).ok().map(Bytes::from)
    }

    fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!("{}~tmp", encode_key(key)));
        fs::write(&tmp, &value).map_err(|e| CacheError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| CacheError::io(&path, e))
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        for (_, path) in self.entries()? {
            fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
        }
        Ok(())
    }

    fn remove_by_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        for (key, path) in self.entries()? {
            if key.starts_with(prefix) {
                fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
            }
        }
        Ok(())
    }
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, b) in key.bytes().enumerate() {
        if is_plain(b) && !(i == 0 && b == b'.') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Inverse of [`encode_key`]. Returns `None` for names this store did not
/// produce (temporary files, foreign files).
fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    if bytes.first() == Some(&b'.') {
        return None;
    }
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = name.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if is_plain(b) => {
                out.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_encoding_is_reversible() {
        for key in ["orm.metadata.User", "orm.connection.Article|Tag", "a b/c%"] {
            assert_eq!(decode_key(&encode_key(key)).as_deref(), Some(key));
        }
    }

    #[test]
    fn temporary_names_are_not_keys() {
        assert_eq!(decode_key("orm.metadata.User~tmp"), None);
    }

    #[test]
    fn dot_keys_stay_inside_the_store() {
        assert_eq!(encode_key("."), "%2E");
        assert_eq!(encode_key(".."), "%2E.");
        assert_eq!(encode_key(".hidden"), "%2Ehidden");
        for key in [".", "..", ".hidden"] {
            assert_eq!(decode_key(&encode_key(key)).as_deref(), Some(key));
        }
        assert_eq!(decode_key(".gitignore"), None);
    }

    #[test]
    fn dot_keys_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("cache")).unwrap();
        store.set("..", Bytes::from_static(b"parent")).unwrap();
        store.set(".", Bytes::from_static(b"self")).unwrap();

        assert_eq!(store.get("..").as_deref(), Some(&b"parent"[..]));
        assert_eq!(store.get(".").as_deref(), Some(&b"self"[..]));
        assert!(store.dir().is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        assert!(matches!(
            store.set("", Bytes::from_static(b"x")),
            Err(CacheError::InvalidKey(_))
        ));
        assert_eq!(store.get(""), None);
    }
}
