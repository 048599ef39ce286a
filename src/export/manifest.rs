use std::{collections::BTreeMap, fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub count: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub app_version: String,
    pub schema_version: String,
    pub created_at: String,
    pub tables: BTreeMap<String, TableInfo>,
}

impl ExportManifest {
    pub fn new(app_version: impl Into<String>, schema_version: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            schema_version: schema_version.into(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            tables: BTreeMap::new(),
        }
    }
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("open file for hashing: {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
