/// コア型定義
///
/// Domain層の中心となるデータ構造。
/// 検出からサーボ駆動までの全処理で共有される不変の型。

use std::fmt;
use std::time::Duration;

/// 認識対象のゴミカテゴリ
///
/// 1カテゴリが物理サーボ1チャネルに1:1で対応する。
/// カテゴリ集合は設定時点で固定（モデルのクラスと一致させる）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasteCategory {
    /// 紙ゴミ（緑ビン、サーボ1）
    Paper,
    /// ペットボトル（青ビン、サーボ2）
    PlasticBottle,
}

impl WasteCategory {
    /// 全カテゴリ（統計集計・イテレーション用）
    pub const ALL: [WasteCategory; 2] = [WasteCategory::Paper, WasteCategory::PlasticBottle];

    /// 対応するサーボチャネル番号を取得（エンドポイント /servo{n} のn）
    pub fn servo_channel(&self) -> u8 {
        match self {
            WasteCategory::Paper => 1,
            WasteCategory::PlasticBottle => 2,
        }
    }

    /// 表示用ラベルを取得
    pub fn label(&self) -> &'static str {
        match self {
            WasteCategory::Paper => "paper",
            WasteCategory::PlasticBottle => "plastic bottle",
        }
    }

    /// 投入先ビンの名称を取得（ステータス表示用）
    pub fn bin_name(&self) -> &'static str {
        match self {
            WasteCategory::Paper => "GREEN BIN (Servo 1)",
            WasteCategory::PlasticBottle => "BLUE BIN (Servo 2)",
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// ピクセル座標のバウンディングボックス（左上・右下）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// 新しいバウンディングボックスを作成
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 幅を取得
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    /// 高さを取得
    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// 面積を取得（ピクセル数）
    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }
}

/// 分類器の1出力（1フレーム内の1候補）
///
/// フレームごとに生成される一時データであり、永続化されない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// 検出カテゴリ
    pub category: WasteCategory,
    /// 信頼度スコア [0.0, 1.0]
    pub confidence: f32,
    /// 検出領域
    pub bbox: BoundingBox,
    /// フレーム面積に対する検出領域の比率 [0.0, 1.0]
    pub size_ratio: f32,
}

impl Detection {
    /// フレームサイズから面積比を導出してDetectionを作成
    ///
    /// # Arguments
    /// - `category`: 検出カテゴリ
    /// - `confidence`: 信頼度スコア [0.0, 1.0]
    /// - `bbox`: 検出領域
    /// - `frame_width` / `frame_height`: フレームの寸法（ピクセル）
    pub fn new(
        category: WasteCategory,
        confidence: f32,
        bbox: BoundingBox,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let frame_area = (frame_width as f32) * (frame_height as f32);
        let size_ratio = if frame_area > 0.0 {
            bbox.area() as f32 / frame_area
        } else {
            0.0
        };

        Self {
            category,
            confidence,
            bbox,
            size_ratio,
        }
    }
}

/// 駆動サイクル内の時間駆動サブ状態
///
/// 遷移は Idle → Operating → Cooldown → Idle のみ（経過時間で単調に進む）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// 待機中（新しい投入を受付可能）
    #[default]
    Idle,
    /// サーボ動作中
    Operating,
    /// クールダウン中
    Cooldown,
}

/// 1回の駆動サイクルの終端結果
///
/// 統計に追記された後は変更されない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationOutcome {
    /// 対象カテゴリ
    pub category: WasteCategory,
    /// 成功したか（open→close両方が2xxで完了）
    pub success: bool,
    /// open試行からclose成功までの実測時間（成功時のみ）
    pub elapsed: Option<Duration>,
}

impl OperationOutcome {
    /// 成功の結果を作成
    pub fn success(category: WasteCategory, elapsed: Duration) -> Self {
        Self {
            category,
            success: true,
            elapsed: Some(elapsed),
        }
    }

    /// 失敗の結果を作成（所要時間は記録しない）
    pub fn failure(category: WasteCategory) -> Self {
        Self {
            category,
            success: false,
            elapsed: None,
        }
    }
}

/// 表示層向けの読み取り専用スナップショット
///
/// フレームごとにポーリングされる想定。最大1フレーム分の古さは許容される。
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayStatus {
    /// 駆動サイクルが進行中か
    pub active: bool,
    /// 進行中サイクルの対象カテゴリ
    pub category: Option<WasteCategory>,
    /// 現在のフェーズ
    pub phase: Phase,
    /// 残り秒数カウントダウン（Operating中のみ非ゼロ）
    pub countdown: u32,
    /// オペレーター向けステータスメッセージ
    pub message: String,
}

impl DisplayStatus {
    /// 待機状態のステータスを作成
    pub fn idle() -> Self {
        Self {
            active: false,
            category: None,
            phase: Phase::Idle,
            countdown: 0,
            message: "READY".to_string(),
        }
    }
}
