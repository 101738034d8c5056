use anyhow::Context;
use smart_dustbin::application::actuator::ActuatorClient;
use smart_dustbin::application::coordinator::ActuationCoordinator;
use smart_dustbin::application::pipeline::PerceptionRunner;
use smart_dustbin::application::stats::StatsRecorder;
use smart_dustbin::domain::{
    AppConfig, BoundingBox, Detection, ServoCommandPort, WasteCategory,
};
use smart_dustbin::infrastructure::http_servo::HttpServoAdapter;
use smart_dustbin::infrastructure::mock_detector::MockDetectorAdapter;
use smart_dustbin::infrastructure::mock_servo::MockServoAdapter;
use smart_dustbin::logging::init_logging;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    // ログシステムの初期化（非同期ファイル出力 + 標準出力）
    let log_dir = PathBuf::from("logs");
    let _guard = init_logging("info", false, Some(log_dir));
    // 注意: _guardはmain終了まで保持する必要がある（Dropでログスレッドが終了）

    tracing::info!("smart_dustbin starting...");

    match run() {
        Ok(_) => {
            tracing::info!("smart_dustbin terminated gracefully.");
        }
        Err(e) => {
            tracing::error!("Fatal error: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// アプリケーションのメイン処理
fn run() -> anyhow::Result<()> {
    // 設定ファイルの読み込み（存在しない場合はデフォルト設定を使用）
    let config = match AppConfig::from_file("config.toml") {
        Ok(config) => {
            tracing::info!("Loaded configuration from config.toml");
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load config.toml: {:?}, using defaults", e);
            AppConfig::default()
        }
    };

    config.validate().context("configuration validation failed")?;

    tracing::info!("Configuration validated successfully");
    tracing::info!(
        "Actuator: {} (request timeout={}ms, settle={}ms)",
        config.actuator.base_url(),
        config.actuator.request_timeout_ms,
        config.actuator.settle_delay_ms
    );
    tracing::info!(
        "Detection: confidence>={:.2}, size=[{:.2}, {:.2}]",
        config.detection.confidence_threshold,
        config.detection.min_size_ratio,
        config.detection.max_size_ratio
    );
    tracing::info!(
        "Coordinator: operation={}ms, cooldown={}ms",
        config.coordinator.operation_duration_ms,
        config.coordinator.cooldown_duration_ms
    );

    // サーボコントローラーの死活確認
    // 到達不能な場合はデモモード（モックサーボ）で起動する
    let servo: Arc<dyn ServoCommandPort> = if HttpServoAdapter::probe(&config.actuator) {
        tracing::info!("Initializing HTTP servo adapter...");
        Arc::new(HttpServoAdapter::new(&config.actuator)?)
    } else {
        tracing::warn!("Servo controller unreachable - running in DEMO MODE");
        tracing::warn!("Servo commands will be logged but not sent");
        Arc::new(MockServoAdapter::new())
    };

    let stats = StatsRecorder::new();
    let actuator = Arc::new(ActuatorClient::new(servo, config.actuator.clone()));
    let coordinator = ActuationCoordinator::new(actuator, stats.clone(), &config.coordinator);

    // 検出器の初期化
    // 物体検出モデル本体はこのプロセスの外部コンポーネント。
    // スタンドアロン実行ではスクリプト化されたデモ検出列を流す。
    tracing::info!("Initializing demo detector (scripted detection stream)...");
    let detector = MockDetectorAdapter::new(
        demo_detection_script(&config),
        Duration::from_millis(config.pipeline.frame_interval_ms),
    );

    tracing::info!("Starting perception pipeline (Detector -> Coordination)...");
    let runner = PerceptionRunner::new(
        detector,
        coordinator,
        stats.clone(),
        config.detection.clone(),
        config.pipeline.clone(),
    );

    let report = runner.run()?;

    // セッション終了レポート
    stats.log_session_report(report.session_duration, report.frame_count);

    Ok(())
}

/// デモ用の検出列を生成
///
/// paper → (空白) → plastic bottle の順で検出イベントを流す。
/// 各駆動の間には operation + cooldown が完了するだけの空フレームを挟む。
fn demo_detection_script(config: &AppConfig) -> Vec<Vec<Detection>> {
    let width = config.detection.frame_width;
    let height = config.detection.frame_height;
    let bbox = BoundingBox::new(width / 4, height / 4, width * 3 / 4, height * 3 / 4);

    // 駆動サイクル1回分をカバーする空フレーム数
    let cycle_ms = config.actuator.settle_delay_ms
        + config.coordinator.operation_duration_ms
        + config.coordinator.cooldown_duration_ms;
    let gap_frames = (cycle_ms / config.pipeline.frame_interval_ms.max(1) + 2) as usize;

    let mut frames: Vec<Vec<Detection>> = Vec::new();

    frames.push(vec![Detection::new(
        WasteCategory::Paper,
        0.91,
        bbox,
        width,
        height,
    )]);
    frames.extend(std::iter::repeat_with(Vec::new).take(gap_frames));

    frames.push(vec![Detection::new(
        WasteCategory::PlasticBottle,
        0.95,
        bbox,
        width,
        height,
    )]);
    frames.extend(std::iter::repeat_with(Vec::new).take(gap_frames));

    frames
}
