use super::backend::StorageBackend;
use crate::error::{MarginError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const FILE_EXT: &str = ".json";

/// Filesystem backend: one pretty-printed JSON file per key.
///
/// ```text
/// <root>/
/// ├── exposition_123.json
/// └── suggestions_123_456.json
/// ```
///
/// Characters outside `[A-Za-z0-9_-]` are percent-encoded in file names.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", encode_key(key), FILE_EXT))
    }

    async fn ensure_root(&self) -> Result<()> {
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            fs::create_dir_all(&self.root).await.map_err(storage_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err(e)),
        };
        let value = serde_json::from_str(&content).map_err(MarginError::Serialization)?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.ensure_root().await?;
        let content = serde_json::to_string_pretty(&value).map_err(MarginError::Serialization)?;

        // Atomic write
        let tmp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, content).await.map_err(storage_err)?;
        fs::rename(&tmp_path, self.path_for(key))
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root).await.map_err(storage_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(storage_err)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(FILE_EXT) {
                if let Some(key) = decode_key(stem) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn storage_err(e: std::io::Error) -> MarginError {
    MarginError::Storage(e.to_string())
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_encoding_round_trips() {
        for key in ["exposition_123", "suggestions_a b_ü/é", "plain-key"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_safe_keys_are_unchanged() {
        assert_eq!(encode_key("suggestions_1_2"), "suggestions_1_2");
    }

    #[test]
    fn test_decode_rejects_truncated_escape() {
        assert!(decode_key("abc%4").is_none());
    }
}
