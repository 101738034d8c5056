//! サーボ駆動クライアント
//!
//! open → 落下待機 → close のシーケンスを実行し、結果をOperationOutcomeに
//! まとめます。必ずバックグラウンドスレッド上で実行され、知覚ループを
//! ブロックしません。
//!
//! # エラー方針
//! ポートのエラー（タイムアウト・接続失敗・非成功応答）はすべてこの層で
//! 吸収し、失敗Outcomeに変換します。呼び出し側にErrが返ることはなく、
//! 知覚ループをクラッシュさせることもありません。

use std::sync::Arc;
use std::time::Instant;

use crate::domain::{ActuatorConfig, OperationOutcome, ServoCommandPort, WasteCategory};

/// サーボ駆動クライアント
///
/// ポートの実装（実HTTP / デモ用モック）に関わらず同一のプロトコルと
/// タイミングで駆動する。デモモードの分岐はアダプタ選択時に済んでおり、
/// ここには持ち込まない。
pub struct ActuatorClient {
    servo: Arc<dyn ServoCommandPort>,
    config: ActuatorConfig,
}

impl ActuatorClient {
    /// 新しいActuatorClientを作成
    ///
    /// # Arguments
    /// - `servo`: サーボ指令ポートの実装
    /// - `config`: 角度・タイムアウト・落下待機時間の設定
    pub fn new(servo: Arc<dyn ServoCommandPort>, config: ActuatorConfig) -> Self {
        Self { servo, config }
    }

    /// 1回の駆動サイクルを実行
    ///
    /// # シーケンス
    /// 1. open角度を送信（失敗したら即failure、closeは送信しない —
    ///    メカは失敗時点の状態のまま残り、それは統計で可視化される）
    /// 2. 落下待機（settle_delay）
    /// 3. close角度を送信
    /// 4. open試行からclose成功までの実測時間を記録
    ///
    /// # Returns
    /// 成功または失敗のOperationOutcome。Errは返さない。
    pub fn operate(&self, category: WasteCategory) -> OperationOutcome {
        let (open_angle, close_angle) = self.config.angles_for(category);
        let started = Instant::now();

        tracing::info!(
            "Opening lid: {} servo{} angle={}",
            category.bin_name(),
            category.servo_channel(),
            open_angle
        );

        if let Err(e) = self.servo.send_angle(category, open_angle) {
            tracing::warn!("Lid open failed for {}: {}", category, e);
            return OperationOutcome::failure(category);
        }

        tracing::info!(
            "Lid opened, waiting {:.1}s for waste to drop",
            self.config.settle_delay().as_secs_f64()
        );
        std::thread::sleep(self.config.settle_delay());

        tracing::info!(
            "Closing lid: {} servo{} angle={}",
            category.bin_name(),
            category.servo_channel(),
            close_angle
        );

        if let Err(e) = self.servo.send_angle(category, close_angle) {
            tracing::warn!("Lid close failed for {}: {}", category, e);
            return OperationOutcome::failure(category);
        }

        let elapsed = started.elapsed();
        tracing::info!(
            "Lid cycle complete for {} in {:.2}s",
            category,
            elapsed.as_secs_f64()
        );

        OperationOutcome::success(category, elapsed)
    }
}
