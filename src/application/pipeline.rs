//! 知覚パイプライン制御モジュール
//!
//! Detector / Coordination の2スレッド構成でパイプラインを制御します。
//! 検出スレッドが外部分類器から結果を取り出し、bounded(1)の最新値のみ
//! キューでメインループへ渡します。メインループはループ1周ごとに
//! コーディネーターのtickを回すため、サーボ駆動中もループが停止する
//! ことはありません（カメラ映像は固まらない）。

use crate::application::coordinator::ActuationCoordinator;
use crate::application::selection::select_best;
use crate::application::stats::{FrameRateMeter, StatsRecorder};
use crate::domain::{
    Detection, DetectionConfig, DetectorPort, DomainResult, PipelineConfig,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// 1フレーム分の検出結果とタイムスタンプのペア
#[derive(Debug, Clone)]
pub(crate) struct TimestampedDetections {
    pub detections: Vec<Detection>,
    #[allow(dead_code)]
    pub captured_at: Instant,
}

/// パイプライン実行結果（セッション終了レポート用）
#[derive(Debug, Clone, Copy)]
pub struct PipelineReport {
    /// 処理したフレーム総数
    pub frame_count: u64,
    /// セッション開始からの経過時間
    pub session_duration: std::time::Duration,
}

/// 知覚パイプライン実行コンテキスト
pub struct PerceptionRunner<D>
where
    D: DetectorPort,
{
    detector: Arc<Mutex<D>>,
    coordinator: ActuationCoordinator,
    stats: StatsRecorder,
    detection_config: DetectionConfig,
    pipeline_config: PipelineConfig,
}

impl<D> PerceptionRunner<D>
where
    D: DetectorPort + Send + 'static,
{
    /// 新しいPerceptionRunnerを作成
    pub fn new(
        detector: D,
        coordinator: ActuationCoordinator,
        stats: StatsRecorder,
        detection_config: DetectionConfig,
        pipeline_config: PipelineConfig,
    ) -> Self {
        Self {
            detector: Arc::new(Mutex::new(detector)),
            coordinator,
            stats,
            detection_config,
            pipeline_config,
        }
    }

    /// パイプラインを起動（ブロッキング）
    ///
    /// 検出ストリームが終了するまで戻らない。
    ///
    /// # Returns
    /// セッション終了レポート（フレーム数・経過時間）
    pub fn run(self) -> DomainResult<PipelineReport> {
        let (tx, rx) = bounded::<TimestampedDetections>(1);

        // Detectorスレッド
        let detector_handle = {
            let detector = Arc::clone(&self.detector);
            std::thread::spawn(move || {
                detector_thread(detector, tx);
            })
        };

        // Coordinationループ（メインスレッドで実行）
        let report = self.coordination_loop(rx);

        let _ = detector_handle.join();

        Ok(report)
    }

    /// メインループ: 選別→submit→tick を繰り返す
    fn coordination_loop(&self, rx: Receiver<TimestampedDetections>) -> PipelineReport {
        let session_start = Instant::now();
        let mut frame_count = 0u64;
        let mut fps_meter = FrameRateMeter::new();
        let mut last_status_log = Instant::now();
        let frame_interval = self.pipeline_config.frame_interval();
        let stats_interval = self.pipeline_config.stats_interval();

        tracing::info!(
            "Coordination loop started (frame interval: {:?})",
            frame_interval
        );

        loop {
            match rx.recv_timeout(frame_interval) {
                Ok(frame) => {
                    frame_count += 1;
                    fps_meter.record_frame();
                    self.process_frame(&frame.detections);
                }
                Err(RecvTimeoutError::Timeout) => {
                    // 新しいフレームなし - フェーズ進行だけ回す
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // 検出ストリーム終了
                    break;
                }
            }

            // ループ1周につき1回フェーズを進める（駆動中も停止しない）
            let status = self.coordinator.tick();

            if last_status_log.elapsed() >= stats_interval {
                tracing::info!(
                    "FPS: {:.1} | frames: {} | {}",
                    fps_meter.current_fps(),
                    frame_count,
                    status.message
                );
                last_status_log = Instant::now();
            }
        }

        // 進行中のサイクルが残っていれば完了を待つ
        // （submit済みリクエストは必ず1件のOutcomeとして記録される）
        while self.coordinator.tick().active {
            std::thread::sleep(frame_interval);
        }

        PipelineReport {
            frame_count,
            session_duration: session_start.elapsed(),
        }
    }

    /// 1フレーム分の検出結果を処理
    ///
    /// 信頼度・サイズで選別し、最良の1件をコーディネーターへ渡す。
    /// 1フレームにつき高々1回しかsubmitしない。
    fn process_frame(&self, detections: &[Detection]) {
        let qualified: Vec<Detection> = detections
            .iter()
            .filter(|d| d.confidence >= self.detection_config.confidence_threshold)
            .copied()
            .collect();

        let Some(best) = select_best(&qualified, &self.detection_config) else {
            return;
        };

        if self.coordinator.status().active {
            // ビジー中は選択自体を破棄（drop-on-busy）
            return;
        }

        if self.coordinator.submit(best.category) {
            self.stats.record_confidence(best.category, best.confidence);
            tracing::info!(
                "{} detected (confidence: {:.0}%) -> triggering servo {}",
                best.category.label().to_uppercase(),
                best.confidence * 100.0,
                best.category.servo_channel()
            );
        }
    }
}

/// Detectorスレッドのメインループ
fn detector_thread<D: DetectorPort>(
    detector: Arc<Mutex<D>>,
    tx: Sender<TimestampedDetections>,
) {
    tracing::info!("Detector thread started");

    loop {
        let result = {
            let mut guard = detector.lock().unwrap();
            guard.next_frame()
        };

        match result {
            Ok(Some(detections)) => {
                let timestamped = TimestampedDetections {
                    detections,
                    captured_at: Instant::now(),
                };
                send_latest_only(&tx, timestamped);
            }
            Ok(None) => {
                // ストリーム終了
                tracing::info!("Detector stream ended");
                break;
            }
            Err(e) => {
                tracing::warn!("Detector error: {:?}", e);
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }
    }
}

/// 最新のみ上書きポリシーで送信
///
/// bounded(1)キューを使用し、キューが満杯の場合は古いデータを破棄。
/// これにより常に最新のフレームのみが処理される。
pub(crate) fn send_latest_only<T>(tx: &Sender<T>, value: T) {
    match tx.try_send(value) {
        Ok(_) => {}
        Err(TrySendError::Full(_)) => {
            // キューが満杯 - 古いデータは受信側が破棄する
        }
        Err(TrySendError::Disconnected(_)) => {
            // Channel closed
        }
    }
}
