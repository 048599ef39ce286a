use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{ImportError, ImportSource};
use crate::export::manifest::{file_sha256, ExportManifest};
use crate::export::DatasetHeader;
use crate::tables::TableDescriptor;

/// Reader for the on-disk bundle layout written by `export::BundleSink`.
///
/// Loading verifies every data file's SHA-256 digest against the manifest
/// before any row reaches the importer; a tampered or truncated bundle is
/// rejected up front rather than half-imported.
#[derive(Debug)]
pub struct BundleSource {
    root: PathBuf,
    manifest: ExportManifest,
}

impl BundleSource {
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, ImportError> {
        let root = root.into();
        let manifest_path = root.join("manifest.json");
        let payload = fs::read(&manifest_path).map_err(|err| ImportError::Io {
            path: manifest_path.display().to_string(),
            source: err,
        })?;
        let manifest: ExportManifest =
            serde_json::from_slice(&payload).map_err(|err| ImportError::Parse {
                path: manifest_path.display().to_string(),
                source: err,
            })?;

        let source = Self { root, manifest };
        source.verify_digests()?;
        Ok(source)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, table: &str) -> PathBuf {
        self.root.join("data").join(format!("{table}.jsonl"))
    }

    fn verify_digests(&self) -> Result<(), ImportError> {
        for (table, info) in &self.manifest.tables {
            let path = self.data_path(table);
            let actual = file_sha256(&path).map_err(|err| ImportError::Io {
                path: path.display().to_string(),
                source: std::io::Error::other(err),
            })?;
            if actual != info.sha256 {
                return Err(ImportError::DigestMismatch {
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl ImportSource for BundleSource {
    fn header(&mut self) -> Result<DatasetHeader, ImportError> {
        Ok(DatasetHeader {
            app_version: self.manifest.app_version.clone(),
            schema_version: self.manifest.schema_version.clone(),
            created_at: self.manifest.created_at.clone(),
        })
    }

    fn read_table(&mut self, table: &TableDescriptor) -> Result<Vec<Value>, ImportError> {
        let Some(info) = self.manifest.tables.get(table.name) else {
            // Absent from the manifest means the producer had nothing for
            // this table; treated as empty rather than as corruption.
            return Ok(Vec::new());
        };

        let path = self.data_path(table.name);
        let file = File::open(&path).map_err(|err| ImportError::Io {
            path: path.display().to_string(),
            source: err,
        })?;
        let reader = BufReader::new(file);

        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|err| ImportError::Io {
                path: path.display().to_string(),
                source: err,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value =
                serde_json::from_str(trimmed).map_err(|err| ImportError::Parse {
                    path: path.display().to_string(),
                    source: err,
                })?;
            rows.push(value);
        }

        if rows.len() as u64 != info.count {
            return Err(ImportError::CountMismatch {
                table: table.name.to_string(),
                expected: info.count,
                actual: rows.len() as u64,
            });
        }
        Ok(rows)
    }

    fn close(&mut self) -> Result<(), ImportError> {
        Ok(())
    }
}
