//! File access for key files, envelopes and decrypted output.

use anyhow::{Context, Result, bail};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A single file read whole and replaced atomically.
#[derive(Clone, Debug)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the entire file into memory.
    pub fn load(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))
    }

    /// Loads the file as UTF-8 text.
    pub fn load_string(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))
    }

    /// Writes `data`, replacing any existing file.
    ///
    /// Data goes to a randomly named sibling first, is fsynced, then renamed
    /// over the target; a crash leaves either the old or the new file.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.random_tmp_path()?;

        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .context("failed to create temporary file")?;

        tmp_file.write_all(data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).context("atomic replace failed");
        }

        #[cfg(unix)]
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }

        Ok(())
    }

    /// Like [`Storage::save`], but refuses to replace an existing file.
    pub fn create(&self, data: &[u8]) -> Result<()> {
        if self.exists() {
            bail!("{} already exists", self.path.display());
        }
        self.save(data)
    }

    /// `<file>.tmp.<16 hex chars>` next to the target.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8];
        fill(&mut buf).context("OS random generator unavailable")?;

        let suffix: String = buf.iter().map(|b| format!("{b:02x}")).collect();

        let file_name = self
            .path
            .file_name()
            .context("output path has no file name")?
            .to_string_lossy();

        Ok(self.path.with_file_name(format!("{file_name}.tmp.{suffix}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_returns_written_data() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("msg.sealed"));

        storage.save(b"hello world").unwrap();
        assert_eq!(storage.load().unwrap(), b"hello world");
    }

    #[test]
    fn load_fails_if_file_does_not_exist() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("missing"));
        assert!(storage.load().is_err());
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let storage = Storage::new(path.clone());

        storage.save(b"first").unwrap();
        storage.save(b"second").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("key.jwk"));

        storage.create(b"{}").unwrap();
        let err = storage.create(b"{}").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("out.bin"));
        storage.save(b"data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries, vec!["out.bin"]);
    }

    #[test]
    fn tmp_names_are_unique_siblings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let storage = Storage::new(path.clone());

        let a = storage.random_tmp_path().unwrap();
        let b = storage.random_tmp_path().unwrap();

        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("out.bin");

        Storage::new(nested.clone()).save(b"data").unwrap();
        assert!(nested.exists());
    }
}
