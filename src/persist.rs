//! Q-table storage.
//!
//! A table is written as a versioned list of `(state bits, action values)`
//! rows. Files ending in `.json` use JSON, everything else bincode. A missing
//! file loads as an empty table; a file that decodes but does not describe a
//! valid table is rejected as a whole.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{ActionValues, QTable};
use crate::error::PersistError;
use crate::state::DiscreteState;

const TABLE_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Bincode,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Bincode,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TableFile {
    version: u32,
    rows: Vec<Row>,
}

#[derive(Serialize, Deserialize)]
struct Row {
    state: u16,
    values: ActionValues,
}

impl TableFile {
    fn from_table(table: &QTable) -> Self {
        let mut rows: Vec<Row> = table
            .iter()
            .map(|(s, v)| Row { state: s.bits(), values: *v })
            .collect();
        rows.sort_by_key(|r| r.state);
        Self { version: TABLE_VERSION, rows }
    }

    fn into_table(self) -> Result<QTable, PersistError> {
        if self.version != TABLE_VERSION {
            return Err(PersistError::Malformed(format!(
                "unsupported version {} (expected {})",
                self.version, TABLE_VERSION
            )));
        }
        let mut seen = HashSet::with_capacity(self.rows.len());
        let mut table = QTable::new();
        for row in self.rows {
            let s = DiscreteState::from_bits(row.state).ok_or_else(|| {
                PersistError::Malformed(format!("invalid state key {:#06x}", row.state))
            })?;
            if !seen.insert(s) {
                return Err(PersistError::Malformed(format!(
                    "state {:#06x} listed twice",
                    row.state
                )));
            }
            if row.values.iter().any(|v| !v.is_finite()) {
                return Err(PersistError::Malformed(format!(
                    "non-finite action value for state {:#06x}",
                    row.state
                )));
            }
            table.insert(s, row.values);
        }
        Ok(table)
    }
}

/// Reads a table, or returns an empty one if `path` does not exist.
pub fn load(path: &Path) -> Result<QTable, PersistError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no saved q-table, starting empty");
            return Ok(QTable::new());
        }
        Err(e) => {
            return Err(PersistError::Io { path: path.to_path_buf(), source: e });
        }
    };

    let file: TableFile = match Format::for_path(path) {
        Format::Json => serde_json::from_slice(&bytes)?,
        Format::Bincode => {
            let (file, read): (TableFile, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
            if read != bytes.len() {
                return Err(PersistError::Malformed(format!(
                    "{} trailing bytes after table",
                    bytes.len() - read
                )));
            }
            file
        }
    };
    let table = file.into_table()?;
    info!(path = %path.display(), states = table.len(), "loaded q-table");
    Ok(table)
}

/// Writes `table`, creating parent directories as needed. The bytes go to a
/// sibling `.tmp` file first and are renamed over `path`, so an interrupted
/// save leaves the previous table intact.
pub fn save(table: &QTable, path: &Path) -> Result<(), PersistError> {
    let file = TableFile::from_table(table);
    let bytes = match Format::for_path(path) {
        Format::Json => serde_json::to_vec_pretty(&file)?,
        Format::Bincode => bincode::serde::encode_to_vec(&file, bincode::config::standard())?,
    };

    let io_err = |e| PersistError::Io { path: path.to_path_buf(), source: e };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes)
        .map_err(|e| PersistError::Io { path: tmp.clone(), source: e })?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    info!(path = %path.display(), states = table.len(), "saved q-table");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
