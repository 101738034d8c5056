/// Port定義（Clean Architectureのインターフェース）
///
/// Domain層が外部実装に依存するための抽象trait。
/// Infrastructure層がこれらを実装し、Application層がDIで注入する。

use crate::domain::{Detection, DomainResult, WasteCategory};

/// サーボ指令ポート: 物理デバイスへの角度指令送信を抽象化
///
/// 1回のsend_angleが「open」または「close」のどちらか片方の指令に対応する。
/// open→待機→closeのシーケンス制御はApplication層（ActuatorClient）の責務。
pub trait ServoCommandPort: Send + Sync {
    /// 指定カテゴリのサーボチャネルに角度指令を送信
    ///
    /// # Arguments
    /// - `category`: 対象カテゴリ（サーボチャネルに1:1対応）
    /// - `angle`: サーボ角度（度）
    ///
    /// # Returns
    /// - `Ok(())`: デバイスが成功応答（2xx相当）を返した
    /// - `Err(DomainError)`: タイムアウト・接続失敗・非成功応答
    fn send_angle(&self, category: WasteCategory, angle: u16) -> DomainResult<()>;

    /// デバイスとの接続状態を確認（起動時プローブの結果）
    fn is_connected(&self) -> bool;
}

/// 検出器ポート: 外部分類器からのフレーム単位の検出結果取得を抽象化
///
/// モデル推論・フレーム取得そのものはこのコアの対象外であり、
/// このポートの向こう側に隠蔽される。
pub trait DetectorPort: Send {
    /// 次のフレームの検出結果を取得
    ///
    /// # Returns
    /// - `Ok(Some(detections))`: 1フレーム分の検出結果（空のVecは「検出なし」）
    /// - `Ok(None)`: ストリーム終了（セッション終了）
    /// - `Err(DomainError)`: 検出器エラー（呼び出し側でログし、継続可能）
    fn next_frame(&mut self) -> DomainResult<Option<Vec<Detection>>>;
}
