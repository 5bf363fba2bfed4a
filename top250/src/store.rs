use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::{FIELD_NAMES, Record};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads and writes the record set as BOM-prefixed UTF-8 CSV
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Write `records` in rank order, replacing any previous file
    pub async fn save(&self, records: &[Record]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Err(StoreError::Empty);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let bytes = encode_csv(records)?;
        fs::write(&self.path, bytes).await?;

        info!("💾 Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    pub async fn load(&self) -> Result<Vec<Record>, StoreError> {
        if !self.exists().await {
            return Err(StoreError::NotFound(self.path.clone()));
        }

        let bytes = fs::read(&self.path).await?;
        let records = decode_csv(&bytes)?;

        debug!("📂 Loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Raw file contents, for download
    pub async fn read_bytes(&self) -> Result<Vec<u8>, StoreError> {
        if !self.exists().await {
            return Err(StoreError::NotFound(self.path.clone()));
        }
        Ok(fs::read(&self.path).await?)
    }
}

/// Header row plus one row per record, BOM first
pub fn encode_csv(records: &[Record]) -> Result<Vec<u8>, StoreError> {
    let mut buf = UTF8_BOM.to_vec();
    {
        let mut writer = csv::WriterBuilder::new().terminator(csv::Terminator::CRLF).from_writer(&mut buf);
        writer.write_record(FIELD_NAMES)?;
        for record in records {
            writer.write_record(record.fields())?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Inverse of [`encode_csv`]; the BOM is optional and missing columns read as empty
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<Record>, StoreError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(bytes);

    let mut records = Vec::new();
    for row in reader.deserialize::<Record>() {
        records.push(row?);
    }
    Ok(records)
}

/// Attachment name for a download taken at `now`
pub fn download_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("douban_top250_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
