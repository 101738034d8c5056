//! モックサーボアダプタ
//!
//! デモモード用のサーボ指令モック実装。
//! 送信されるはずだったリクエストをログに出力するのみで、
//! 実際のHTTP送信は行わない。タイミング（落下待機・フェーズ遷移）は
//! 実機と同一に動作する。

use crate::domain::{DomainResult, ServoCommandPort, WasteCategory};

/// モックサーボアダプタ
pub struct MockServoAdapter;

impl MockServoAdapter {
    /// 新しいモックサーボアダプタを作成
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockServoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoCommandPort for MockServoAdapter {
    fn send_angle(&self, category: WasteCategory, angle: u16) -> DomainResult<()> {
        tracing::info!(
            "[DEMO] would send GET /servo{}?angle={}",
            category.servo_channel(),
            angle
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        // デモモードでは常に接続済み扱い
        true
    }
}
