//! # Analysis Configuration DTO
//!
//! バッチ解析設定のData Transfer Object

use crate::domain::entities::dataset::SlugMethod;
use crate::domain::entities::units::{LengthUnit, TimeUnit};
use crate::domain::repositories::dataset_repository::DataFileSpec;
use crate::domain::services::slug_models::AnalysisOptions;

/// バッチ解析設定
///
/// 設定ファイルとコマンドライン引数を解決した後の値
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// 試験データファイルのディレクトリ（相対パスの基準）
    pub data_dir: String,
    /// 結果の出力先ディレクトリ
    pub output_dir: String,
    /// バッチ定義で指定が無い場合の解析手法
    pub method: SlugMethod,
    pub length_unit: LengthUnit,
    pub time_unit: TimeUnit,
    /// 時間列の名前
    pub time_column: String,
    /// 水位列の名前
    pub head_column: String,
    pub options: AnalysisOptions,
    /// 解析対象の試験ID（空なら全件）
    pub selected_ids: Vec<String>,
    /// true の場合は結果を保存しない
    pub dry_run: bool,
}

impl AnalysisConfig {
    /// 新しい解析設定を作成します。
    ///
    /// 列名は `Time` / `Head`、選択は全件、保存ありで初期化されます。
    ///
    /// # 例
    ///
    /// ```
    /// use slugfit::application::dto::analysis_config::AnalysisConfig;
    /// use slugfit::domain::entities::dataset::SlugMethod;
    /// use slugfit::domain::entities::units::{LengthUnit, TimeUnit};
    /// use slugfit::domain::services::slug_models::AnalysisOptions;
    ///
    /// let config = AnalysisConfig::new(
    ///     "./data".to_string(),
    ///     "./output".to_string(),
    ///     SlugMethod::BouwerRice,
    ///     LengthUnit::M,
    ///     TimeUnit::S,
    ///     AnalysisOptions::default(),
    /// );
    ///
    /// assert_eq!(config.time_column, "Time");
    /// assert!(config.selected_ids.is_empty());
    /// assert!(!config.dry_run);
    /// ```
    ///
    /// フィート・分単位で一部の試験だけを解析する設定：
    ///
    /// ```
    /// # use slugfit::application::dto::analysis_config::AnalysisConfig;
    /// # use slugfit::domain::entities::dataset::SlugMethod;
    /// # use slugfit::domain::entities::units::{LengthUnit, TimeUnit};
    /// # use slugfit::domain::services::slug_models::AnalysisOptions;
    /// let config = AnalysisConfig::new(
    ///     "./data".to_string(),
    ///     "./output".to_string(),
    ///     SlugMethod::Hvorslev,
    ///     LengthUnit::Ft,
    ///     TimeUnit::Min,
    ///     AnalysisOptions::default(),
    /// )
    /// .with_selection(vec!["MW-1".to_string()])
    /// .with_dry_run(true);
    ///
    /// assert_eq!(config.data_file_spec().time_unit, TimeUnit::Min);
    /// assert_eq!(config.selected_ids, vec!["MW-1"]);
    /// ```
    pub fn new(
        data_dir: String,
        output_dir: String,
        method: SlugMethod,
        length_unit: LengthUnit,
        time_unit: TimeUnit,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            data_dir,
            output_dir,
            method,
            length_unit,
            time_unit,
            time_column: "Time".to_string(),
            head_column: "Head".to_string(),
            options,
            selected_ids: Vec::new(),
            dry_run: false,
        }
    }

    pub fn with_columns(mut self, time_column: String, head_column: String) -> Self {
        self.time_column = time_column;
        self.head_column = head_column;
        self
    }

    pub fn with_selection(mut self, selected_ids: Vec<String>) -> Self {
        self.selected_ids = selected_ids;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// データファイル読み込み用の列指定
    pub fn data_file_spec(&self) -> DataFileSpec {
        DataFileSpec {
            time_column: self.time_column.clone(),
            head_column: self.head_column.clone(),
            time_unit: self.time_unit,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn config() -> AnalysisConfig {
        AnalysisConfig::new(
            "/data".to_string(),
            "/output".to_string(),
            SlugMethod::BouwerRice,
            LengthUnit::M,
            TimeUnit::S,
            AnalysisOptions::default(),
        )
    }
}
