//! HTTPサーボアダプタ
//!
//! ESP8266マイコン上のHTTPサーバーに対してGETリクエストで角度指令を
//! 送信する実装。1チャンネルにつき1エンドポイント
//! （`/servo1?angle=N` / `/servo2?angle=N`）。
//!
//! reqwestのblockingクライアントを使用する。駆動は専用スレッド上で
//! 実行されるため、リクエストがタイムアウトまでブロックしても
//! 知覚ループには影響しない。

use crate::domain::{ActuatorConfig, DomainError, DomainResult, ServoCommandPort, WasteCategory};

/// HTTPサーボアダプタ
pub struct HttpServoAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpServoAdapter {
    /// 新しいHTTPサーボアダプタを作成
    ///
    /// # Arguments
    /// - `config`: 接続先ホスト・ポート・タイムアウト設定
    ///
    /// # Errors
    /// HTTPクライアントの構築に失敗した場合
    pub fn new(config: &ActuatorConfig) -> DomainResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DomainError::Initialization(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    /// コントローラーの死活確認
    ///
    /// 起動時に1回だけ呼ばれる。短いタイムアウト（probe_timeout）で
    /// ベースURLへGETし、応答があれば到達可能とみなす。
    /// ステータスコードは問わない（応答が返ること自体が死活の証拠）。
    pub fn probe(config: &ActuatorConfig) -> bool {
        let client = match reqwest::blocking::Client::builder()
            .timeout(config.probe_timeout())
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Probe client build failed: {}", e);
                return false;
            }
        };

        match client.get(config.base_url()).send() {
            Ok(response) => {
                tracing::info!(
                    "Servo controller reachable at {} (status: {})",
                    config.base_url(),
                    response.status()
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Servo controller unreachable at {}: {}",
                    config.base_url(),
                    e
                );
                false
            }
        }
    }
}

impl ServoCommandPort for HttpServoAdapter {
    fn send_angle(&self, category: WasteCategory, angle: u16) -> DomainResult<()> {
        let url = format!(
            "{}/servo{}?angle={}",
            self.base_url,
            category.servo_channel(),
            angle
        );

        let response = self.client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                DomainError::Timeout(format!("GET {}: {}", url, e))
            } else {
                DomainError::Actuator(format!("GET {}: {}", url, e))
            }
        })?;

        if !response.status().is_success() {
            return Err(DomainError::Actuator(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        tracing::debug!("Servo command sent: {}", url);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}
