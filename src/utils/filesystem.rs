use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// File system helpers used by collectors and emitters
pub struct FileSystemUtils;

impl FileSystemUtils {
    /// Create a directory and its parents if missing
    pub fn create_dir_all(path: &Path) -> Result<(), io::Error> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Empty `dir`, keeping top-level entries named in `keep`, and make sure it exists
    pub fn clean_dir(dir: &Path, keep: &[&str]) -> Result<(), io::Error> {
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                if keep.iter().any(|k| entry.file_name() == *k) {
                    continue;
                }
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
            }
        }
        Self::create_dir_all(dir)
    }

    /// Write a file, creating parent directories
    pub fn write_string(path: &Path, content: &str) -> Result<(), io::Error> {
        if let Some(parent) = path.parent() {
            Self::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }

    /// Serialize `value` as pretty JSON into `path`
    pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), io::Error> {
        let data = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            Self::create_dir_all(parent)?;
        }
        fs::write(path, data)
    }

    /// Copy a file, creating the destination directory
    pub fn copy_file(src: &Path, dst: &Path) -> Result<(), io::Error> {
        if let Some(parent) = dst.parent() {
            Self::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
        Ok(())
    }

    /// Hex encoded SHA-256 of a file's contents
    pub fn sha256_file(path: &Path) -> Result<String, io::Error> {
        let mut file = fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Relative path from `base` to `path`
    pub fn relative_path(path: &Path, base: &Path) -> Option<PathBuf> {
        pathdiff::diff_paths(path, base)
    }

    /// Render a relative path as an absolute URL path, `/a/b/c`
    pub fn url_path(path: &Path) -> String {
        let mut url = String::new();
        for component in path.components() {
            if let Component::Normal(part) = component {
                url.push('/');
                url.push_str(&part.to_string_lossy());
            }
        }
        if url.is_empty() {
            url.push('/');
        }
        url
    }
}
