//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::{DomainError, DomainResult, WasteCategory};

/// アプリケーション設定のルート構造
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    /// サーボ駆動設定
    pub actuator: ActuatorConfig,
    /// 検出フィルタ設定
    pub detection: DetectionConfig,
    /// 駆動コーディネーター設定
    pub coordinator: CoordinatorConfig,
    /// パイプライン設定
    pub pipeline: PipelineConfig,
}

/// サーボ駆動設定
///
/// ESP8266 Webサーバーのエンドポイントと角度指令値。
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActuatorConfig {
    /// デバイスのホスト（IPアドレスまたはホスト名）
    pub host: String,

    /// HTTPポート
    ///
    /// デフォルト: 80
    #[serde(default = "default_actuator_port")]
    pub port: u16,

    /// open/close各リクエストのタイムアウト（ミリ秒）
    ///
    /// デフォルト: 5000ms
    pub request_timeout_ms: u64,

    /// 起動時接続プローブのタイムアウト（ミリ秒）
    ///
    /// デフォルト: 3000ms
    pub probe_timeout_ms: u64,

    /// ゴミが落下するまでの待機時間（ミリ秒）
    ///
    /// open成功からcloseを送信するまでの間隔。
    /// バックグラウンドスレッド上でのみ消費され、知覚ループは停止しない。
    /// デフォルト: 6000ms
    pub settle_delay_ms: u64,

    /// サーボ1（紙）のopen角度（度）
    pub servo1_open_angle: u16,
    /// サーボ1（紙）のclose角度（度）
    pub servo1_close_angle: u16,
    /// サーボ2（ペットボトル）のopen角度（度）
    pub servo2_open_angle: u16,
    /// サーボ2（ペットボトル）のclose角度（度）
    pub servo2_close_angle: u16,
}

fn default_actuator_port() -> u16 {
    ActuatorConfig::DEFAULT_PORT
}

impl ActuatorConfig {
    /// デフォルトのHTTPポート
    pub const DEFAULT_PORT: u16 = 80;
    /// デフォルトのリクエストタイムアウト（ミリ秒）
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
    /// デフォルトのプローブタイムアウト（ミリ秒）
    pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;
    /// デフォルトの落下待機時間（ミリ秒）
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 6000;

    /// ベースURLを取得（例: "http://192.168.138.133:80"）
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// カテゴリに対応する (open角度, close角度) を解決
    pub fn angles_for(&self, category: WasteCategory) -> (u16, u16) {
        match category {
            WasteCategory::Paper => (self.servo1_open_angle, self.servo1_close_angle),
            WasteCategory::PlasticBottle => (self.servo2_open_angle, self.servo2_close_angle),
        }
    }

    /// リクエストタイムアウトをDurationとして取得
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// プローブタイムアウトをDurationとして取得
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// 落下待機時間をDurationとして取得
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        // 角度のデフォルトは実機の組み付けに合わせた値
        // （サーボ1: open=0°/close=180°, サーボ2: open=180°/close=0°）
        Self {
            host: "192.168.138.133".to_string(),
            port: Self::DEFAULT_PORT,
            request_timeout_ms: Self::DEFAULT_REQUEST_TIMEOUT_MS,
            probe_timeout_ms: Self::DEFAULT_PROBE_TIMEOUT_MS,
            settle_delay_ms: Self::DEFAULT_SETTLE_DELAY_MS,
            servo1_open_angle: 0,
            servo1_close_angle: 180,
            servo2_open_angle: 180,
            servo2_close_angle: 0,
        }
    }
}

/// 検出フィルタ設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionConfig {
    /// 信頼度の下限閾値 [0.0, 1.0]
    ///
    /// デフォルト: 0.60
    pub confidence_threshold: f32,

    /// 検出領域のフレーム面積比の下限
    ///
    /// これ未満の検出は無視（遠すぎる・小さすぎる物体の除外）
    /// デフォルト: 0.03
    pub min_size_ratio: f32,

    /// 検出領域のフレーム面積比の上限
    ///
    /// デフォルト: 1.0
    pub max_size_ratio: f32,

    /// 検出器のフレーム幅（ピクセル、面積比の分母）
    pub frame_width: u32,

    /// 検出器のフレーム高さ（ピクセル）
    pub frame_height: u32,
}

impl DetectionConfig {
    /// デフォルトの信頼度閾値
    pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.60;
    /// デフォルトの面積比下限
    pub const DEFAULT_MIN_SIZE_RATIO: f32 = 0.03;
    /// デフォルトの面積比上限
    pub const DEFAULT_MAX_SIZE_RATIO: f32 = 1.0;
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: Self::DEFAULT_CONFIDENCE_THRESHOLD,
            min_size_ratio: Self::DEFAULT_MIN_SIZE_RATIO,
            max_size_ratio: Self::DEFAULT_MAX_SIZE_RATIO,
            frame_width: 1280,
            frame_height: 720,
        }
    }
}

/// 駆動コーディネーター設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CoordinatorConfig {
    /// Operatingフェーズの長さ（ミリ秒）
    ///
    /// デフォルト: 4000ms
    pub operation_duration_ms: u64,

    /// Cooldownフェーズの長さ（ミリ秒）
    ///
    /// デフォルト: 500ms
    pub cooldown_duration_ms: u64,
}

impl CoordinatorConfig {
    /// デフォルトのOperating時間（ミリ秒）
    pub const DEFAULT_OPERATION_DURATION_MS: u64 = 4000;
    /// デフォルトのCooldown時間（ミリ秒）
    pub const DEFAULT_COOLDOWN_DURATION_MS: u64 = 500;

    /// Operating時間をDurationとして取得
    pub fn operation_duration(&self) -> Duration {
        Duration::from_millis(self.operation_duration_ms)
    }

    /// Cooldown時間をDurationとして取得
    pub fn cooldown_duration(&self) -> Duration {
        Duration::from_millis(self.cooldown_duration_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            operation_duration_ms: Self::DEFAULT_OPERATION_DURATION_MS,
            cooldown_duration_ms: Self::DEFAULT_COOLDOWN_DURATION_MS,
        }
    }
}

/// パイプライン設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    /// メインループのフレーム間隔（ミリ秒）
    ///
    /// 検出結果が届かない場合でもこの間隔でtickを回す
    /// デフォルト: 33ms（約30fps）
    pub frame_interval_ms: u64,

    /// 定期ステータスログの出力間隔（秒）
    pub stats_interval_sec: u64,
}

impl PipelineConfig {
    /// デフォルトのフレーム間隔（ミリ秒）
    pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;
    /// デフォルトの統計出力間隔（秒）
    pub const DEFAULT_STATS_INTERVAL_SEC: u64 = 10;

    /// フレーム間隔をDurationとして取得
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// 統計出力間隔をDurationとして取得
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_sec)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: Self::DEFAULT_FRAME_INTERVAL_MS,
            stats_interval_sec: Self::DEFAULT_STATS_INTERVAL_SEC,
        }
    }
}

impl AppConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> DomainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| DomainError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// デフォルト設定をTOMLファイルに書き出す
    #[allow(dead_code)]
    pub fn write_default<P: AsRef<Path>>(path: P) -> DomainResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            DomainError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)
            .map_err(|e| DomainError::Configuration(format!("Failed to write config file: {}", e)))
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> DomainResult<()> {
        // 検出フィルタの検証
        let det = &self.detection;
        if !(0.0..=1.0).contains(&det.confidence_threshold) {
            return Err(DomainError::Configuration(
                "confidence_threshold must be within [0.0, 1.0]".to_string(),
            ));
        }
        if det.min_size_ratio < 0.0 || det.max_size_ratio > 1.0 {
            return Err(DomainError::Configuration(
                "Size ratios must be within [0.0, 1.0]".to_string(),
            ));
        }
        if det.min_size_ratio > det.max_size_ratio {
            return Err(DomainError::Configuration(
                "min_size_ratio must be <= max_size_ratio".to_string(),
            ));
        }
        if det.frame_width == 0 || det.frame_height == 0 {
            return Err(DomainError::Configuration(
                "Frame dimensions must be greater than 0".to_string(),
            ));
        }

        // サーボ駆動設定の検証
        if self.actuator.host.is_empty() {
            return Err(DomainError::Configuration(
                "Actuator host must not be empty".to_string(),
            ));
        }
        if self.actuator.request_timeout_ms == 0 {
            return Err(DomainError::Configuration(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        // コーディネーター設定の検証
        if self.coordinator.operation_duration_ms == 0 {
            return Err(DomainError::Configuration(
                "Operation duration must be greater than 0".to_string(),
            ));
        }

        // パイプライン設定の検証
        if self.pipeline.frame_interval_ms == 0 {
            return Err(DomainError::Configuration(
                "Frame interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.actuator.request_timeout_ms, 5000);
        assert_eq!(config.actuator.settle_delay_ms, 6000);
        assert_eq!(config.detection.confidence_threshold, 0.60);
        assert_eq!(config.coordinator.operation_duration_ms, 4000);
        assert_eq!(config.coordinator.cooldown_duration_ms, 500);
    }

    #[test]
    fn test_angles_for_category() {
        let config = ActuatorConfig::default();
        // サーボ1（紙）: open=0°, close=180°
        assert_eq!(config.angles_for(WasteCategory::Paper), (0, 180));
        // サーボ2（ペットボトル）: open=180°, close=0°
        assert_eq!(config.angles_for(WasteCategory::PlasticBottle), (180, 0));
    }

    #[test]
    fn test_base_url() {
        let config = ActuatorConfig {
            host: "192.168.1.10".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://192.168.1.10:8080");
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        // 不正な信頼度閾値
        config.detection.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config.detection.confidence_threshold = 0.6;

        // 不正な面積比（min > max）
        config.detection.min_size_ratio = 0.9;
        config.detection.max_size_ratio = 0.1;
        assert!(config.validate().is_err());

        config.detection.min_size_ratio = 0.03;
        config.detection.max_size_ratio = 1.0;

        // 空のホスト
        config.actuator.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_accessors() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.operation_duration(), Duration::from_secs(4));
        assert_eq!(config.cooldown_duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_loads() {
        // config.tomlが正常に読み込めることを確認
        let config = AppConfig::from_file("config.toml").expect("config.tomlが読み込めません");

        config
            .validate()
            .expect("設定値のバリデーションに失敗しました");

        assert!(
            config.actuator.request_timeout_ms > 0,
            "request_timeout_msは0より大きい必要があります"
        );
        assert!(
            config.coordinator.operation_duration_ms > 0,
            "operation_duration_msは0より大きい必要があります"
        );
    }

    #[test]
    fn test_config_example_loads() {
        // config.toml.exampleが正常に読み込めることを確認
        let config = AppConfig::from_file("config.toml.example")
            .expect("config.toml.exampleが読み込めません");

        config
            .validate()
            .expect("設定値のバリデーションに失敗しました");
    }

    #[test]
    fn test_write_default_round_trip() {
        // write_defaultで書き出したファイルが読み戻せる
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        AppConfig::write_default(&path).unwrap();
        let config = AppConfig::from_file(&path).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.actuator.settle_delay_ms, 6000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // portを省略した場合はデフォルト値が使われる
        let toml = r#"
            [actuator]
            host = "10.0.0.5"
            request_timeout_ms = 5000
            probe_timeout_ms = 3000
            settle_delay_ms = 6000
            servo1_open_angle = 0
            servo1_close_angle = 180
            servo2_open_angle = 180
            servo2_close_angle = 0

            [detection]
            confidence_threshold = 0.6
            min_size_ratio = 0.03
            max_size_ratio = 1.0
            frame_width = 1280
            frame_height = 720

            [coordinator]
            operation_duration_ms = 4000
            cooldown_duration_ms = 500

            [pipeline]
            frame_interval_ms = 33
            stats_interval_sec = 10
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.actuator.port, ActuatorConfig::DEFAULT_PORT);
        assert_eq!(config.actuator.host, "10.0.0.5");
    }
}
