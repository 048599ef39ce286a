use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::manifest::{file_sha256, ExportManifest, TableInfo};
use super::{DatasetHeader, ExportError, ExportSink};
use crate::tables::TableDescriptor;

const PARTIAL_SUFFIX: &str = ".partial";

/// Sink writing the on-disk bundle layout:
///
/// ```text
/// <root>/
///   manifest.json
///   data/<table>.jsonl
/// ```
///
/// Each data file is written through a `.partial` sibling and renamed into
/// place, so a bundle never contains a half-written table file. The manifest
/// carries per-table row counts and SHA-256 digests and is written on
/// `close`.
pub struct BundleSink {
    root: PathBuf,
    manifest: Option<ExportManifest>,
}

impl BundleSink {
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let root = root.into();
        let data_dir = root.join("data");
        fs::create_dir_all(&data_dir).map_err(|err| ExportError::Io {
            path: data_dir.display().to_string(),
            source: err,
        })?;
        Ok(Self {
            root,
            manifest: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, table: &str) -> PathBuf {
        self.root.join("data").join(format!("{table}.jsonl"))
    }
}

impl ExportSink for BundleSink {
    fn open(&mut self, header: &DatasetHeader) -> Result<(), ExportError> {
        self.manifest = Some(ExportManifest {
            app_version: header.app_version.clone(),
            schema_version: header.schema_version.clone(),
            created_at: header.created_at.clone(),
            tables: Default::default(),
        });
        Ok(())
    }

    fn write_table(
        &mut self,
        table: &TableDescriptor,
        rows: &[Value],
    ) -> Result<(), ExportError> {
        let path = self.data_path(table.name);
        let tmp = tmp_path(&path);
        let mut file = fs::File::create(&tmp).map_err(|err| ExportError::Io {
            path: tmp.display().to_string(),
            source: err,
        })?;
        for row in rows {
            serde_json::to_writer(&mut file, row).map_err(|err| ExportError::Serialize {
                table: table.name.to_string(),
                source: err,
            })?;
            file.write_all(b"\n").map_err(|err| ExportError::Io {
                path: tmp.display().to_string(),
                source: err,
            })?;
        }
        file.flush().ok();
        drop(file);
        fs::rename(&tmp, &path).map_err(|err| ExportError::Io {
            path: path.display().to_string(),
            source: err,
        })?;

        let sha = file_sha256(&path).map_err(|err| ExportError::Io {
            path: path.display().to_string(),
            source: std::io::Error::other(err),
        })?;
        if let Some(manifest) = self.manifest.as_mut() {
            manifest.tables.insert(
                table.name.to_string(),
                TableInfo {
                    count: rows.len() as u64,
                    sha256: sha,
                },
            );
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ExportError> {
        let Some(manifest) = self.manifest.take() else {
            return Ok(());
        };
        let path = self.root.join("manifest.json");
        let payload =
            serde_json::to_vec_pretty(&manifest).map_err(|err| ExportError::Serialize {
                table: "manifest".to_string(),
                source: err,
            })?;
        let tmp = tmp_path(&path);
        fs::write(&tmp, &payload).map_err(|err| ExportError::Io {
            path: tmp.display().to_string(),
            source: err,
        })?;
        fs::rename(&tmp, &path).map_err(|err| ExportError::Io {
            path: path.display().to_string(),
            source: err,
        })?;
        Ok(())
    }
}

fn tmp_path(final_path: &Path) -> PathBuf {
    let mut s = OsString::from(final_path.as_os_str());
    s.push(PARTIAL_SUFFIX);
    PathBuf::from(s)
}
