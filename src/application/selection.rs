//! 検出候補の選別ポリシー
//!
//! 1フレーム分の検出結果から、駆動対象となる最大1件を選び出します。

use crate::domain::{Detection, DetectionConfig};

/// サイズフィルタを適用し、最も信頼度の高い1件を選択
///
/// # ポリシー
/// - 面積比が [min_size_ratio, max_size_ratio] の範囲外の検出は破棄
/// - 残りからカテゴリ横断で信頼度が厳密に最大の1件を選ぶ
/// - 同値の場合は先に出現した方が勝つ（明示的なタイブレーク。
///   検出列が決定的にソートされていない限り実装間で安定とは限らない）
///
/// # Returns
/// 選択された検出。候補がなければNone（エラーではない）
pub fn select_best(detections: &[Detection], config: &DetectionConfig) -> Option<Detection> {
    let mut best: Option<Detection> = None;

    for det in detections {
        if det.size_ratio < config.min_size_ratio || det.size_ratio > config.max_size_ratio {
            continue;
        }

        match best {
            Some(current) if det.confidence <= current.confidence => {}
            _ => best = Some(*det),
        }
    }

    best
}
