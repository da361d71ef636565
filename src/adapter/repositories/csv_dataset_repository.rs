//! CSV Dataset Repository Implementation
//!
//! DatasetRepositoryのファイルシステム実装（CSV/TSV/空白区切りテキスト）

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::domain::entities::time_series::TimeSeries;
use crate::domain::errors::{DatasetError, ValidationError};
use crate::domain::repositories::dataset_repository::{
    DataFileSpec, DatasetRepository, ManifestRecord,
};

/// 発見対象の拡張子
const DATA_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// 数値以外の時間列として受け付けるタイムスタンプ形式
const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S%.f",
];

/// 区切り文字の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Byte(u8),
    Whitespace,
}

impl Delimiter {
    fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("csv") => Delimiter::Byte(b','),
            Some("tsv") => Delimiter::Byte(b'\t'),
            _ => Delimiter::Whitespace,
        }
    }
}

/// 行番号付きの表
struct Table {
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

/// ファイルシステムベースのデータセットリポジトリ
pub struct CsvDatasetRepository;

impl CsvDatasetRepository {
    /// 新しいリポジトリを作成
    pub fn new() -> Self {
        Self
    }

    /// 試験データファイルを発見する（内部実装）
    fn discover_data_files_internal(data_dir: &str) -> Result<Vec<PathBuf>> {
        let expanded_path = shellexpand::tilde(data_dir);
        let data_dir = PathBuf::from(expanded_path.as_ref());

        if !data_dir.exists() {
            warn!("Data directory does not exist: {}", data_dir.display());
            return Ok(Vec::new());
        }

        let mut data_files = Vec::new();

        for entry in WalkDir::new(&data_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let extension = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase());
            if path.is_file()
                && extension.is_some_and(|ext| DATA_EXTENSIONS.contains(&ext.as_str()))
            {
                data_files.push(path.to_path_buf());
            }
        }

        info!(
            "Found {} data files in {}",
            data_files.len(),
            data_dir.display()
        );

        Ok(data_files)
    }

    /// バッチ定義ファイルを読み込む（同期処理）
    fn load_manifest_sync(manifest_path: &Path) -> Result<Vec<ManifestRecord>> {
        let content = fs::read_to_string(manifest_path)
            .with_context(|| format!("Failed to read batch file: {}", manifest_path.display()))?;

        let delimiter = match Delimiter::for_path(manifest_path) {
            Delimiter::Byte(b) => b,
            Delimiter::Whitespace => b',',
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("Failed to parse batch file")?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let Some(header) = rows.first() else {
            bail!("Batch file is empty: {}", manifest_path.display());
        };

        let records = if header
            .first()
            .is_some_and(|cell| cell.eq_ignore_ascii_case("field"))
        {
            Self::records_from_columns(&rows)?
        } else {
            Self::records_from_rows(&rows)?
        };

        Ok(records)
    }

    /// 1行1試験の形式
    fn records_from_rows(rows: &[Vec<String>]) -> Result<Vec<ManifestRecord>> {
        let header: Vec<String> = rows[0].iter().map(|h| normalize_field(h)).collect();
        if !header.iter().any(|h| h == "test_id") {
            bail!("Batch file has no 'test_id' column");
        }

        let records = rows[1..]
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let fields: BTreeMap<String, String> = header
                    .iter()
                    .zip(row)
                    .filter(|(_, value)| !value.is_empty())
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                Self::record(fields, i + 1)
            })
            .collect();

        Ok(records)
    }

    /// 1行1項目で試験が列に並ぶ形式
    fn records_from_columns(rows: &[Vec<String>]) -> Result<Vec<ManifestRecord>> {
        if !rows.iter().any(|row| normalize_field(&row[0]) == "test_id") {
            bail!("Batch file has no 'test_id' field");
        }

        let test_count = rows[0].len().saturating_sub(1);
        let records = (1..=test_count)
            .map(|column| {
                let fields: BTreeMap<String, String> = rows[1..]
                    .iter()
                    .filter_map(|row| {
                        let value = row.get(column)?;
                        (!value.is_empty()).then(|| (normalize_field(&row[0]), value.clone()))
                    })
                    .collect();
                Self::record(fields, column)
            })
            .collect();

        Ok(records)
    }

    fn record(fields: BTreeMap<String, String>, position: usize) -> ManifestRecord {
        let test_id = match fields.get("test_id") {
            Some(id) => id.clone(),
            None => {
                warn!("Test definition #{} has no test_id", position);
                format!("#{}", position)
            }
        };
        ManifestRecord::new(test_id, position, fields)
    }

    /// 試験データファイルを読み込む（同期処理）
    fn load_time_series_sync(
        file_path: &Path,
        spec: &DataFileSpec,
    ) -> std::result::Result<TimeSeries, DatasetError> {
        let path_str = file_path.display().to_string();
        let content = fs::read_to_string(file_path).map_err(|e| DatasetError::io(&path_str, &e))?;

        let table = read_table(&content, Delimiter::for_path(file_path), &path_str)?;
        if table.header.is_empty() || table.rows.is_empty() {
            return Err(ValidationError::EmptyDataset.into());
        }

        let time_index = find_column(&table.header, &spec.time_column, &path_str)?;
        let head_index = find_column(&table.header, &spec.head_column, &path_str)?;

        let mut times = Vec::with_capacity(table.rows.len());
        let mut heads = Vec::with_capacity(table.rows.len());
        let mut origin: Option<NaiveDateTime> = None;
        let mut numeric_time: Option<bool> = None;

        for (line, row) in &table.rows {
            let malformed = |reason: String| DatasetError::MalformedFile {
                path: path_str.clone(),
                line: *line,
                reason,
            };

            let time_cell = row
                .get(time_index)
                .ok_or_else(|| malformed(format!("missing '{}' value", spec.time_column)))?;
            let head_cell = row
                .get(head_index)
                .ok_or_else(|| malformed(format!("missing '{}' value", spec.head_column)))?;

            let head: f64 = head_cell
                .parse()
                .map_err(|_| malformed(format!("'{}' is not a number", head_cell)))?;

            let time = match time_cell.parse::<f64>() {
                Ok(value) if numeric_time != Some(false) => {
                    numeric_time = Some(true);
                    value
                }
                _ => {
                    if numeric_time == Some(true) {
                        return Err(malformed(format!("'{}' is not a number", time_cell)));
                    }
                    let stamp = parse_timestamp(time_cell)
                        .ok_or_else(|| malformed(format!("'{}' is not a time", time_cell)))?;
                    numeric_time = Some(false);
                    let first = *origin.get_or_insert(stamp);
                    elapsed_seconds(first, stamp) / spec.time_unit.in_seconds()
                }
            };

            times.push(time);
            heads.push(head);
        }

        debug!("Read {} samples from {}", times.len(), path_str);

        let pairs: Vec<(f64, f64)> = times.into_iter().zip(heads).collect();
        Ok(TimeSeries::from_pairs(&pairs)?)
    }
}

/// 区切り文字に応じて表を読み込む
fn read_table(
    content: &str,
    delimiter: Delimiter,
    path: &str,
) -> std::result::Result<Table, DatasetError> {
    let mut lines: Vec<(usize, Vec<String>)> = Vec::new();

    match delimiter {
        Delimiter::Byte(byte) => {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(byte)
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::All)
                .comment(Some(b'#'))
                .from_reader(content.as_bytes());

            for record in reader.records() {
                let record = record.map_err(|e| DatasetError::MalformedFile {
                    path: path.to_string(),
                    line: e.position().map(|p| p.line() as usize).unwrap_or(0),
                    reason: e.to_string(),
                })?;
                let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
                lines.push((line, record.iter().map(str::to_string).collect()));
            }
        }
        Delimiter::Whitespace => {
            for (i, line) in content.lines().enumerate() {
                if line.trim_start().starts_with('#') {
                    continue;
                }
                lines.push((
                    i + 1,
                    line.split_whitespace().map(str::to_string).collect(),
                ));
            }
        }
    }

    lines.retain(|(_, cells)| cells.iter().any(|c| !c.is_empty()));

    let mut iter = lines.into_iter();
    let header = iter.next().map(|(_, cells)| cells).unwrap_or_default();
    Ok(Table {
        header,
        rows: iter.collect(),
    })
}

fn find_column(header: &[String], name: &str, path: &str) -> std::result::Result<usize, DatasetError> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| DatasetError::MissingColumn {
            path: path.to_string(),
            column: name.to_string(),
        })
}

fn normalize_field(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

/// RFC 3339 または既知の形式のタイムスタンプを解析する
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn elapsed_seconds(origin: NaiveDateTime, stamp: NaiveDateTime) -> f64 {
    let delta = stamp - origin;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

#[async_trait]
impl DatasetRepository for CsvDatasetRepository {
    async fn discover_data_files(&self, data_dir: &str) -> Result<Vec<PathBuf>> {
        let data_dir = data_dir.to_string();
        tokio::task::spawn_blocking(move || Self::discover_data_files_internal(&data_dir))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }

    async fn load_manifest(&self, manifest_path: &Path) -> Result<Vec<ManifestRecord>> {
        let manifest_path = manifest_path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::load_manifest_sync(&manifest_path))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }

    async fn load_time_series(
        &self,
        file_path: &Path,
        spec: &DataFileSpec,
    ) -> std::result::Result<TimeSeries, DatasetError> {
        let file_path = file_path.to_path_buf();
        let path_str = file_path.display().to_string();
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || Self::load_time_series_sync(&file_path, &spec))
            .await
            .map_err(|e| DatasetError::Io {
                path: path_str,
                message: format!("Failed to spawn blocking task: {}", e),
            })?
    }
}

impl Default for CsvDatasetRepository {
    fn default() -> Self {
        Self::new()
    }
}
