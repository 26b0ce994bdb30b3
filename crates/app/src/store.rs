//! Durable workspace state: one JSON document per data file, keyed by its
//! sanitized display name, plus one document for the rule config. The
//! engine never touches this layer; it is handed deserialized structures.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use tally_core::DataFile;
use tally_engine::{ConfigError, Session};

const FILE_PREFIX: &str = "file-";
const CONFIG_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no usable data directory on this platform")]
    NoDataDir,
}

pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open_default() -> Result<Self, StoreError> {
        let dirs = directories::ProjectDirs::from("dev", "tally", "Tally")
            .ok_or(StoreError::NoDataDir)?;
        Self::open(dirs.data_dir())
    }

    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        Ok(Store { dir: dir.to_path_buf() })
    }

    /// Persist the whole session: every data file plus the rule config.
    /// Stale file entries (removed or renamed files) are deleted so the
    /// store mirrors the session exactly.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let wanted: Vec<PathBuf> = session
            .data_files()
            .iter()
            .map(|f| self.data_file_path(&f.name))
            .collect();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_file_entry(&path) && !wanted.contains(&path) {
                fs::remove_file(&path)?;
            }
        }

        for file in session.data_files() {
            let json = serde_json::to_string(file).map_err(|source| StoreError::Corrupt {
                path: self.data_file_path(&file.name),
                source,
            })?;
            fs::write(self.data_file_path(&file.name), json)?;
        }

        fs::write(self.dir.join(CONFIG_NAME), session.export_config()?)?;
        Ok(())
    }

    /// Rebuild a session from disk. A corrupt data-file entry is skipped
    /// with a warning rather than taking the whole workspace down.
    pub fn load(&self) -> Result<Session, StoreError> {
        let mut session = Session::new();

        let config_path = self.dir.join(CONFIG_NAME);
        if config_path.exists() {
            session.import_config(&fs::read_to_string(&config_path)?)?;
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .filter(|p| is_file_entry(p))
            .collect();
        entries.sort();

        for path in entries {
            let text = fs::read_to_string(&path)?;
            match serde_json::from_str::<DataFile>(&text) {
                Ok(file) => session.add_data_file(file),
                Err(source) => {
                    let err = StoreError::Corrupt { path, source };
                    warn!(%err, "skipping unreadable store entry");
                }
            }
        }

        Ok(session)
    }

    fn data_file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{}.json", sanitize(name)))
    }
}

fn is_file_entry(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(".json"))
}

/// Storage key for a display name: anything outside `[A-Za-z0-9.-]`
/// becomes `_`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
