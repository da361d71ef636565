//! # Load Datasets Use Case
//!
//! バッチ定義ファイルを読み込み、試験ごとにデータセットを組み立てるユースケース

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::dto::analysis_config::AnalysisConfig;
use crate::domain::entities::batch_run::DatasetLoad;
use crate::domain::entities::dataset::{SlugMethod, SlugTestDataset};
use crate::domain::entities::units::harmonize;
use crate::domain::entities::well_geometry::{AquiferProperties, AquiferType, WellGeometry};
use crate::domain::errors::{DatasetError, ValidationError};
use crate::domain::repositories::dataset_repository::{DatasetRepository, ManifestRecord};

/// データセット読み込みユースケース
///
/// 1件の読み込み失敗はその試験の失敗として記録し、他の試験の読み込みを続ける
pub struct LoadDatasetsUseCase<R: DatasetRepository> {
    dataset_repository: Arc<R>,
}

impl<R: DatasetRepository> LoadDatasetsUseCase<R> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `dataset_repository` - データセットリポジトリ
    pub fn new(dataset_repository: Arc<R>) -> Self {
        Self { dataset_repository }
    }

    /// バッチ定義ファイルからデータセットを読み込む
    ///
    /// # Arguments
    ///
    /// * `manifest_path` - バッチ定義ファイルのパス
    /// * `config` - 解析設定
    ///
    /// # Returns
    ///
    /// 定義ファイルの順序どおりの読み込み結果（失敗を含む）。
    /// 同じ試験IDの2件目以降は `#<位置>` をキーとする失敗になる
    ///
    /// # Errors
    ///
    /// 定義ファイル自体が読めない場合のみエラーを返す
    pub async fn execute(&self, manifest_path: &Path, config: &AnalysisConfig) -> Result<Vec<DatasetLoad>> {
        let records = self
            .dataset_repository
            .load_manifest(manifest_path)
            .await
            .with_context(|| format!("Failed to load batch file {}", manifest_path.display()))?;

        info!("Loaded {} test definitions from {}", records.len(), manifest_path.display());

        let mut loads = Vec::with_capacity(records.len());
        let mut seen_ids = HashSet::new();
        for record in &records {
            if !seen_ids.insert(record.test_id.as_str()) {
                warn!(
                    "Duplicate test_id '{}' at position {}",
                    record.test_id, record.position
                );
                loads.push(DatasetLoad::failed(
                    format!("#{}", record.position),
                    DatasetError::Validation(ValidationError::InvalidField {
                        field: "test_id".to_string(),
                        reason: format!("duplicate '{}'", record.test_id),
                    }),
                ));
                continue;
            }

            let load = match self.load_record(record, config).await {
                Ok(dataset) => DatasetLoad::loaded(dataset),
                Err(e) => {
                    warn!("Test {} could not be loaded: {}", record.test_id, e);
                    DatasetLoad::failed(record.test_id.clone(), e)
                }
            };
            loads.push(load);
        }

        Ok(loads)
    }

    async fn load_record(
        &self,
        record: &ManifestRecord,
        config: &AnalysisConfig,
    ) -> std::result::Result<SlugTestDataset, DatasetError> {
        let definition = TestDefinition::from_record(record, config)?;
        let data_path = resolve_data_path(&definition.data_file, &config.data_dir);
        debug!("Reading {} for test {}", data_path.display(), record.test_id);

        let series = self
            .dataset_repository
            .load_time_series(&data_path, &config.data_file_spec())
            .await?;

        let mut dataset = SlugTestDataset::new(
            record.test_id.clone(),
            series,
            definition.geometry,
            definition.aquifer,
            definition.method,
        )?
        .with_names(definition.well_name, definition.aquifer_name)
        .with_units(config.length_unit, config.time_unit);
        if let Some(is_recovery_data) = definition.is_recovery_data {
            dataset = dataset.with_recovery_flag(is_recovery_data);
        }

        Ok(dataset)
    }
}

/// バッチ定義の1試験分を検証したもの
#[derive(Debug, Clone)]
struct TestDefinition {
    data_file: String,
    geometry: WellGeometry,
    aquifer: AquiferProperties,
    method: SlugMethod,
    well_name: Option<String>,
    aquifer_name: Option<String>,
    is_recovery_data: Option<bool>,
}

impl TestDefinition {
    fn from_record(record: &ManifestRecord, config: &AnalysisConfig) -> std::result::Result<Self, ValidationError> {
        if let Some(test_type) = record.get("test_type") {
            if !test_type.eq_ignore_ascii_case("slug") {
                return Err(ValidationError::InvalidField {
                    field: "test_type".to_string(),
                    reason: format!("unsupported test type '{}'", test_type),
                });
            }
        }

        let data_file = required(record, "test_data_file")?.to_string();

        // 行ごとの長さ単位は設定の長さ単位に揃える
        let scale = match record.get("length_unit") {
            Some(unit) => harmonize(1.0, unit, &config.length_unit.to_string())?,
            None => 1.0,
        };
        let length = |field: &str| number(record, field).map(|v| v * scale);

        let casing_radius = number(record, "casing_radius")?;
        let initial_displacement = match optional_number(record, "initial_displacement")? {
            Some(h0) => Some(h0),
            None => optional_number(record, "slug_volume")?
                .map(|volume| displacement_from_volume(volume, casing_radius)),
        };

        let geometry = WellGeometry::new(
            casing_radius * scale,
            length("well_radius")?,
            length("screen_length")?,
            length("screen_top_depth")?,
            initial_displacement.map(|h0| h0 * scale),
        )?;

        let aquifer_type = match record.get("aquifer_type") {
            Some(value) => value.parse::<AquiferType>()?,
            None => AquiferType::default(),
        };
        let aquifer = AquiferProperties::new(
            aquifer_type,
            length("aquifer_thickness")?,
            length("water_table_depth")?,
            optional_number(record, "anisotropy")?.unwrap_or(1.0),
        )?
        .with_storage(
            optional_number(record, "specific_yield")?,
            optional_number(record, "specific_storage")?.map(|ss| ss / scale),
        );

        let method = match record.get("solution_method") {
            Some(value) => value.parse::<SlugMethod>()?,
            None => config.method,
        };

        let is_recovery_data = record
            .get("is_recovery_data")
            .map(|value| parse_flag("is_recovery_data", value))
            .transpose()?;

        Ok(Self {
            data_file,
            geometry,
            aquifer,
            method,
            well_name: record.get("well_name").map(str::to_string),
            aquifer_name: record.get("aquifer_name").map(str::to_string),
            is_recovery_data,
        })
    }
}

/// スラグ体積からの初期変位 H0 = V / (π r_c²)
pub fn displacement_from_volume(slug_volume: f64, casing_radius: f64) -> f64 {
    slug_volume / (std::f64::consts::PI * casing_radius.powi(2))
}

/// 相対パスはデータディレクトリを基準に解決する
pub fn resolve_data_path(data_file: &str, data_dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde(data_file).to_string();
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        PathBuf::from(shellexpand::tilde(data_dir).to_string()).join(path)
    }
}

fn required<'a>(record: &'a ManifestRecord, field: &str) -> std::result::Result<&'a str, ValidationError> {
    record.get(field).ok_or_else(|| ValidationError::InvalidField {
        field: field.to_string(),
        reason: "missing".to_string(),
    })
}

fn number(record: &ManifestRecord, field: &str) -> std::result::Result<f64, ValidationError> {
    let value = required(record, field)?;
    parse_number(field, value)
}

fn optional_number(record: &ManifestRecord, field: &str) -> std::result::Result<Option<f64>, ValidationError> {
    record.get(field).map(|value| parse_number(field, value)).transpose()
}

fn parse_number(field: &str, value: &str) -> std::result::Result<f64, ValidationError> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: format!("'{}' is not a number", value),
        }),
    }
}

fn parse_flag(field: &str, value: &str) -> std::result::Result<bool, ValidationError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: format!("'{}' is not a boolean", value),
        }),
    }
}
