//! 統計情報管理モジュール
//!
//! カテゴリ別のトリガー回数・成否・信頼度・応答時間を収集し、
//! セッション終了時に評価メトリクスとして出力します。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domain::{OperationOutcome, WasteCategory};

/// カテゴリ別の累積統計
///
/// Recorderの排他区間内でのみ変更される。
#[derive(Debug, Default, Clone)]
struct CategoryStats {
    /// 駆動トリガー回数（submit受理時にカウント）
    triggers: u64,
    /// 成功回数
    successes: u64,
    /// 失敗回数
    failures: u64,
    /// 検出時信頼度の系列（記録順）
    confidences: Vec<f32>,
    /// 応答時間の系列（成功時のみ、記録順）
    response_times: Vec<Duration>,
}

/// 信頼度系列の要約統計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub count: usize,
}

/// 応答時間系列の要約統計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseTimeSummary {
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub count: usize,
}

/// カテゴリ別スナップショット（読み取り専用）
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub category: WasteCategory,
    pub triggers: u64,
    pub successes: u64,
    pub failures: u64,
    /// 成功率（試行0回のカテゴリはNone = "N/A"）
    pub success_rate: Option<f64>,
    pub confidence: Option<ConfidenceSummary>,
    pub response_time: Option<ResponseTimeSummary>,
}

/// 全カテゴリ合算のスナップショット
#[derive(Debug, Clone)]
pub struct OverallSnapshot {
    pub triggers: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: Option<f64>,
    pub confidence: Option<ConfidenceSummary>,
    pub response_time: Option<ResponseTimeSummary>,
}

/// 統計スナップショット全体
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub categories: Vec<CategorySnapshot>,
    pub overall: OverallSnapshot,
}

/// 統計レコーダー（スレッド間で共有、Clone可能）
///
/// 知覚ループ（信頼度記録）とバックグラウンド完了ハンドラ（成否記録）の
/// 両方から同時に呼び出されるため、内部をMutexで保護する。
/// 読み取り（snapshot）は表示層のtickから任意のタイミングで行われ、
/// 多少の古さは許容される。
#[derive(Clone)]
pub struct StatsRecorder {
    inner: Arc<Mutex<HashMap<WasteCategory, CategoryStats>>>,
}

impl StatsRecorder {
    /// 新しいStatsRecorderを作成（全カテゴリ分のエントリを初期化）
    pub fn new() -> Self {
        let mut map = HashMap::new();
        for category in WasteCategory::ALL {
            map.insert(category, CategoryStats::default());
        }
        Self {
            inner: Arc::new(Mutex::new(map)),
        }
    }

    /// 駆動トリガーを記録（submit受理時）
    pub fn record_trigger(&self, category: WasteCategory) {
        let mut guard = self.inner.lock().unwrap();
        guard.entry(category).or_default().triggers += 1;
    }

    /// 検出時の信頼度を記録
    ///
    /// 信頼度は検出時点で確定するため、成否カウンターとは独立に記録する
    /// （成否は駆動完了後にしか分からない）。
    pub fn record_confidence(&self, category: WasteCategory, confidence: f32) {
        let mut guard = self.inner.lock().unwrap();
        guard.entry(category).or_default().confidences.push(confidence);
    }

    /// 駆動完了の結果を記録
    ///
    /// 成功時は応答時間も追記する。
    pub fn record_outcome(&self, outcome: &OperationOutcome) {
        let mut guard = self.inner.lock().unwrap();
        let stats = guard.entry(outcome.category).or_default();

        if outcome.success {
            stats.successes += 1;
            if let Some(elapsed) = outcome.elapsed {
                stats.response_times.push(elapsed);
            }
        } else {
            stats.failures += 1;
        }
    }

    /// 現在の集計値のスナップショットを取得
    ///
    /// min/max/meanは呼び出し時に計算する（この規模では逐次計算は不要）。
    pub fn snapshot(&self) -> StatsSnapshot {
        let guard = self.inner.lock().unwrap();

        let mut categories = Vec::with_capacity(WasteCategory::ALL.len());
        let mut all_confidences: Vec<f32> = Vec::new();
        let mut all_response_times: Vec<Duration> = Vec::new();
        let mut total_triggers = 0u64;
        let mut total_successes = 0u64;
        let mut total_failures = 0u64;

        for category in WasteCategory::ALL {
            let stats = guard.get(&category).cloned().unwrap_or_default();

            total_triggers += stats.triggers;
            total_successes += stats.successes;
            total_failures += stats.failures;
            all_confidences.extend_from_slice(&stats.confidences);
            all_response_times.extend_from_slice(&stats.response_times);

            categories.push(CategorySnapshot {
                category,
                triggers: stats.triggers,
                successes: stats.successes,
                failures: stats.failures,
                success_rate: success_rate(stats.successes, stats.failures),
                confidence: summarize_confidences(&stats.confidences),
                response_time: summarize_durations(&stats.response_times),
            });
        }

        StatsSnapshot {
            categories,
            overall: OverallSnapshot {
                triggers: total_triggers,
                successes: total_successes,
                failures: total_failures,
                success_rate: success_rate(total_successes, total_failures),
                confidence: summarize_confidences(&all_confidences),
                response_time: summarize_durations(&all_response_times),
            },
        }
    }

    /// セッション終了レポートをログ出力
    ///
    /// # Arguments
    /// * `session_duration` - セッション全体の経過時間
    /// * `frame_count` - 処理したフレーム総数
    pub fn log_session_report(&self, session_duration: Duration, frame_count: u64) {
        let snapshot = self.snapshot();
        let secs = session_duration.as_secs_f64();

        tracing::info!("=== SESSION SUMMARY - EVALUATION METRICS ===");
        tracing::info!(
            "Duration: {:.1}s ({:.1} min), frames: {}, avg FPS: {:.1}",
            secs,
            secs / 60.0,
            frame_count,
            if secs > 0.0 { frame_count as f64 / secs } else { 0.0 }
        );

        tracing::info!("--- Detection statistics ---");
        for cat in &snapshot.categories {
            tracing::info!(
                "{:<15} triggers={} success={} failed={} rate={}",
                cat.category.label(),
                cat.triggers,
                cat.successes,
                cat.failures,
                format_rate(cat.success_rate)
            );
        }
        tracing::info!(
            "{:<15} triggers={} success={} failed={} rate={}",
            "TOTAL",
            snapshot.overall.triggers,
            snapshot.overall.successes,
            snapshot.overall.failures,
            format_rate(snapshot.overall.success_rate)
        );

        tracing::info!("--- Confidence metrics ---");
        for cat in &snapshot.categories {
            match cat.confidence {
                Some(summary) => tracing::info!(
                    "{:<15} avg={:.1}% min={:.1}% max={:.1}% (n={})",
                    cat.category.label(),
                    summary.mean * 100.0,
                    summary.min * 100.0,
                    summary.max * 100.0,
                    summary.count
                ),
                None => tracing::info!("{:<15} N/A", cat.category.label()),
            }
        }

        tracing::info!("--- Servo response time ---");
        for cat in &snapshot.categories {
            match cat.response_time {
                Some(summary) => tracing::info!(
                    "{:<15} avg={:.2}s min={:.2}s max={:.2}s (n={})",
                    cat.category.label(),
                    summary.mean.as_secs_f64(),
                    summary.min.as_secs_f64(),
                    summary.max.as_secs_f64(),
                    summary.count
                ),
                None => tracing::info!("{:<15} N/A", cat.category.label()),
            }
        }

        if let Some(summary) = snapshot.overall.response_time {
            tracing::info!(
                "{:<15} avg={:.2}s min={:.2}s max={:.2}s (n={})",
                "OVERALL",
                summary.mean.as_secs_f64(),
                summary.min.as_secs_f64(),
                summary.max.as_secs_f64(),
                summary.count
            );
        }

        tracing::info!("============================================");
    }
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// 成功率を計算（試行0回はNone）
fn success_rate(successes: u64, failures: u64) -> Option<f64> {
    let attempts = successes + failures;
    if attempts == 0 {
        None
    } else {
        Some(successes as f64 / attempts as f64)
    }
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "N/A".to_string(),
    }
}

/// 信頼度系列のmin/max/meanを計算
fn summarize_confidences(values: &[f32]) -> Option<ConfidenceSummary> {
    if values.is_empty() {
        return None;
    }

    let mut min = f32::MAX;
    let mut max = f32::MIN;
    let mut sum = 0.0f64;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v as f64;
    }

    Some(ConfidenceSummary {
        min,
        max,
        mean: (sum / values.len() as f64) as f32,
        count: values.len(),
    })
}

/// 応答時間系列のmin/max/meanを計算
fn summarize_durations(values: &[Duration]) -> Option<ResponseTimeSummary> {
    if values.is_empty() {
        return None;
    }

    let mut min = Duration::MAX;
    let mut max = Duration::ZERO;
    let mut sum = Duration::ZERO;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }

    Some(ResponseTimeSummary {
        min,
        max,
        mean: sum / values.len() as u32,
        count: values.len(),
    })
}

/// FPS計測（スライディングウィンドウ方式）
#[derive(Debug)]
pub struct FrameRateMeter {
    /// 直近1秒分のフレームタイムスタンプ
    frame_times: VecDeque<Instant>,
}

impl FrameRateMeter {
    /// FPS計算の時間範囲（1秒間のフレーム数を計測）
    const FPS_WINDOW_SECS: u64 = 1;

    /// 新しいFrameRateMeterを作成
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::new(),
        }
    }

    /// フレーム受信を記録
    pub fn record_frame(&mut self) {
        let now = Instant::now();
        self.frame_times.push_back(now);

        // 指定秒数より古いタイムスタンプを削除
        let window = Duration::from_secs(Self::FPS_WINDOW_SECS);
        while let Some(&front) = self.frame_times.front() {
            if now.duration_since(front) > window {
                self.frame_times.pop_front();
            } else {
                break;
            }
        }
    }

    /// 現在のFPSを計算
    pub fn current_fps(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }

        let count = self.frame_times.len() as f64;
        if let (Some(&first), Some(&last)) = (self.frame_times.front(), self.frame_times.back()) {
            let elapsed = last.duration_since(first).as_secs_f64();
            if elapsed > 0.0 {
                return count / elapsed;
            }
        }
        0.0
    }
}

impl Default for FrameRateMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_min_mean_max() {
        let recorder = StatsRecorder::new();

        recorder.record_confidence(WasteCategory::Paper, 0.7);
        recorder.record_confidence(WasteCategory::Paper, 0.9);
        recorder.record_confidence(WasteCategory::Paper, 0.8);

        let snapshot = recorder.snapshot();
        let paper = snapshot
            .categories
            .iter()
            .find(|c| c.category == WasteCategory::Paper)
            .unwrap();

        let summary = paper.confidence.unwrap();
        assert!((summary.min - 0.7).abs() < 1e-6);
        assert!((summary.max - 0.9).abs() < 1e-6);
        assert!((summary.mean - 0.8).abs() < 1e-6);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_outcome_counters() {
        let recorder = StatsRecorder::new();

        recorder.record_outcome(&OperationOutcome::success(
            WasteCategory::Paper,
            Duration::from_secs(7),
        ));
        recorder.record_outcome(&OperationOutcome::success(
            WasteCategory::Paper,
            Duration::from_secs(9),
        ));
        recorder.record_outcome(&OperationOutcome::failure(WasteCategory::Paper));

        let snapshot = recorder.snapshot();
        let paper = snapshot
            .categories
            .iter()
            .find(|c| c.category == WasteCategory::Paper)
            .unwrap();

        assert_eq!(paper.successes, 2);
        assert_eq!(paper.failures, 1);

        // 成功率は試行回数（成功+失敗）に対する割合
        let rate = paper.success_rate.unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);

        // 応答時間は成功時のみ記録
        let rt = paper.response_time.unwrap();
        assert_eq!(rt.count, 2);
        assert_eq!(rt.min, Duration::from_secs(7));
        assert_eq!(rt.max, Duration::from_secs(9));
        assert_eq!(rt.mean, Duration::from_secs(8));
    }

    #[test]
    fn test_zero_attempts_rate_is_none() {
        let recorder = StatsRecorder::new();
        // トリガーだけ記録し、完了は記録しない
        recorder.record_trigger(WasteCategory::PlasticBottle);

        let snapshot = recorder.snapshot();
        let plastic = snapshot
            .categories
            .iter()
            .find(|c| c.category == WasteCategory::PlasticBottle)
            .unwrap();

        assert_eq!(plastic.triggers, 1);
        // 試行0回のカテゴリは成功率N/A
        assert!(plastic.success_rate.is_none());
        assert!(plastic.response_time.is_none());
    }

    #[test]
    fn test_overall_combines_categories() {
        let recorder = StatsRecorder::new();

        recorder.record_trigger(WasteCategory::Paper);
        recorder.record_trigger(WasteCategory::PlasticBottle);
        recorder.record_confidence(WasteCategory::Paper, 0.6);
        recorder.record_confidence(WasteCategory::PlasticBottle, 1.0);
        recorder.record_outcome(&OperationOutcome::success(
            WasteCategory::Paper,
            Duration::from_secs(7),
        ));
        recorder.record_outcome(&OperationOutcome::failure(WasteCategory::PlasticBottle));

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.overall.triggers, 2);
        assert_eq!(snapshot.overall.successes, 1);
        assert_eq!(snapshot.overall.failures, 1);
        assert_eq!(snapshot.overall.success_rate, Some(0.5));

        let conf = snapshot.overall.confidence.unwrap();
        assert_eq!(conf.count, 2);
        assert!((conf.mean - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_concurrent_recording() {
        // バックグラウンド完了ハンドラと知覚ループの同時書き込みを模擬
        let recorder = StatsRecorder::new();
        let mut handles = Vec::new();

        for _ in 0..4 {
            let r = recorder.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    r.record_confidence(WasteCategory::Paper, 0.8);
                    r.record_outcome(&OperationOutcome::failure(WasteCategory::Paper));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = recorder.snapshot();
        let paper = snapshot
            .categories
            .iter()
            .find(|c| c.category == WasteCategory::Paper)
            .unwrap();
        assert_eq!(paper.failures, 400);
        assert_eq!(paper.confidence.unwrap().count, 400);
    }

    #[test]
    fn test_frame_rate_meter() {
        let mut meter = FrameRateMeter::new();

        for _ in 0..4 {
            meter.record_frame();
            std::thread::sleep(Duration::from_millis(100));
        }

        let fps = meter.current_fps();
        assert!(fps > 5.0 && fps < 15.0, "FPS should be around 10, got {}", fps);
    }
}
