//! 駆動コーディネーター
//!
//! 「分類イベント→物理駆動」を仲介する状態機械。submitの受理判定、
//! 経過時間によるフェーズ遷移（Operating/Cooldown/Idle）、表示用
//! ステータスの公開を担います。
//!
//! # 並行性の契約
//! - セッション状態は単一のMutexで保護し、submitとバックグラウンド
//!   完了ハンドラの双方がこの排他区間を通る
//! - 受理されたリクエストごとにバックグラウンドスレッドを1本だけ生成し、
//!   同時実行数1はactiveフラグで強制する（スレッドプールは使わない）
//! - ビジー中のsubmitは黙って破棄する（drop-on-busy）。物理ゲートは
//!   1つしかなく、キューイングすると表示と実機の状態が乖離するため

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::application::actuator::ActuatorClient;
use crate::application::stats::StatsRecorder;
use crate::domain::{CoordinatorConfig, DisplayStatus, Phase, WasteCategory};

/// コーディネーター内部のセッション状態
///
/// プロセス全体で1インスタンスのみ存在し、「新しいリクエストを受理して
/// よいか」の唯一の判断基準となる。
#[derive(Debug)]
struct SessionState {
    /// 駆動サイクルが進行中か
    active: bool,
    /// 進行中サイクルの対象カテゴリ
    category: Option<WasteCategory>,
    /// サイクル開始時刻
    started_at: Option<Instant>,
    /// 現在のフェーズ
    phase: Phase,
    /// バックグラウンド駆動の完了結果が統計に記録済みか
    outcome_recorded: bool,
    /// 残り秒数カウントダウン
    countdown: u32,
    /// オペレーター向けメッセージ
    message: String,
}

impl SessionState {
    fn idle(message: &str) -> Self {
        Self {
            active: false,
            category: None,
            started_at: None,
            phase: Phase::Idle,
            outcome_recorded: false,
            countdown: 0,
            message: message.to_string(),
        }
    }

    fn to_display(&self) -> DisplayStatus {
        DisplayStatus {
            active: self.active,
            category: self.category,
            phase: self.phase,
            countdown: self.countdown,
            message: self.message.clone(),
        }
    }
}

/// 駆動コーディネーター
///
/// Clone可能（内部はArc共有）。知覚ループから使用され、表示層は
/// `status()`を読み取り専用でポーリングする。
#[derive(Clone)]
pub struct ActuationCoordinator {
    session: Arc<Mutex<SessionState>>,
    stats: StatsRecorder,
    actuator: Arc<ActuatorClient>,
    operation_duration: Duration,
    cooldown_duration: Duration,
}

impl ActuationCoordinator {
    /// 新しいActuationCoordinatorを作成
    ///
    /// # Arguments
    /// - `actuator`: 駆動クライアント（バックグラウンドスレッドで実行される）
    /// - `stats`: 統計レコーダー
    /// - `config`: フェーズ時間の設定
    pub fn new(
        actuator: Arc<ActuatorClient>,
        stats: StatsRecorder,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(SessionState::idle("READY"))),
            stats,
            actuator,
            operation_duration: config.operation_duration(),
            cooldown_duration: config.cooldown_duration(),
        }
    }

    /// 駆動サイクルの開始を試行
    ///
    /// セッションがビジーの場合は副作用なしで即座にfalseを返す
    /// （エラーではなく定義済みの無視）。受理された場合はセッションを
    /// アクティブ化し、open→待機→closeのシーケンスをバックグラウンド
    /// スレッドに委譲して即座にtrueを返す。呼び出し側がブロックする
    /// ことはない。
    pub fn submit(&self, category: WasteCategory) -> bool {
        {
            let mut session = self.session.lock().unwrap();
            if session.active {
                // drop-on-busy: キューには積まない
                return false;
            }

            let countdown = self.operation_duration.as_secs_f64().ceil() as u32;
            *session = SessionState {
                active: true,
                category: Some(category),
                started_at: Some(Instant::now()),
                phase: Phase::Operating,
                outcome_recorded: false,
                countdown,
                message: format!("SERVO OPERATING... {}s", countdown),
            };
        }

        self.stats.record_trigger(category);
        tracing::info!("Actuation accepted: {} -> {}", category, category.bin_name());

        // バックグラウンド実行単位（受理1件につき1スレッド、同時最大1本）
        let actuator = Arc::clone(&self.actuator);
        let stats = self.stats.clone();
        let session = Arc::clone(&self.session);
        std::thread::spawn(move || {
            let outcome = actuator.operate(category);
            stats.record_outcome(&outcome);

            let mut guard = session.lock().unwrap();
            guard.outcome_recorded = true;
        });

        true
    }

    /// 経過時間に基づいてフェーズを進める
    ///
    /// # フェーズ判定
    /// - elapsed < operation_duration → Operating（カウントダウン表示）
    /// - elapsed < operation + cooldown → Cooldown
    /// - 両時間が経過し、かつ駆動結果が記録済み → Idleへリセット
    ///   （リセットは1サイクルにつき1回だけ発生する）
    ///
    /// 任意の頻度で呼び出してよく、実状態が変わらない限り冪等。
    /// Idle中の呼び出しは完全な無操作。
    pub fn tick(&self) -> DisplayStatus {
        let mut session = self.session.lock().unwrap();

        if !session.active {
            return session.to_display();
        }

        let elapsed = session
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or_default();
        let total = self.operation_duration + self.cooldown_duration;

        if elapsed < self.operation_duration {
            let remaining = self.operation_duration - elapsed;
            session.phase = Phase::Operating;
            session.countdown = remaining.as_secs_f64().ceil() as u32;
            session.message = format!("SERVO OPERATING... {}s", session.countdown);
        } else if elapsed < total || !session.outcome_recorded {
            // 時間経過後も駆動結果が未記録の間はCooldownに留まる。
            // activeはOutcome記録後にのみ解除される
            session.phase = Phase::Cooldown;
            session.countdown = 0;
            session.message = "COOLDOWN...".to_string();
        } else {
            *session = SessionState::idle("READY FOR NEXT DETECTION");
            tracing::info!("Ready for next detection");
        }

        session.to_display()
    }

    /// 現在のステータスの読み取り専用スナップショットを取得
    ///
    /// ブロックせず、状態も変更しない。表示層のフレームごとの
    /// ポーリング用。
    pub fn status(&self) -> DisplayStatus {
        self.session.lock().unwrap().to_display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActuatorConfig, DomainResult, ServoCommandPort};

    /// 常に成功するテスト用サーボ
    struct AlwaysOkServo;

    impl ServoCommandPort for AlwaysOkServo {
        fn send_angle(&self, _category: WasteCategory, _angle: u16) -> DomainResult<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    /// テスト用コーディネーターを作成
    ///
    /// # Arguments
    /// * `operation_ms` / `cooldown_ms` - フェーズ時間（ミリ秒）
    /// * `settle_ms` - 落下待機時間（ミリ秒）
    fn coordinator(
        operation_ms: u64,
        cooldown_ms: u64,
        settle_ms: u64,
    ) -> (ActuationCoordinator, StatsRecorder) {
        let actuator_config = ActuatorConfig {
            settle_delay_ms: settle_ms,
            ..Default::default()
        };
        let stats = StatsRecorder::new();
        let actuator = Arc::new(ActuatorClient::new(Arc::new(AlwaysOkServo), actuator_config));
        let config = CoordinatorConfig {
            operation_duration_ms: operation_ms,
            cooldown_duration_ms: cooldown_ms,
        };
        let coord = ActuationCoordinator::new(actuator, stats.clone(), &config);
        (coord, stats)
    }

    #[test]
    fn test_submit_while_active_is_rejected() {
        let (coord, stats) = coordinator(4000, 500, 10);

        assert!(coord.submit(WasteCategory::Paper));

        // アクティブ中のsubmitはすべて失敗し、状態もトリガー数も変化しない
        assert!(!coord.submit(WasteCategory::Paper));
        assert!(!coord.submit(WasteCategory::PlasticBottle));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.overall.triggers, 1);

        let status = coord.status();
        assert!(status.active);
        assert_eq!(status.category, Some(WasteCategory::Paper));
    }

    #[test]
    fn test_initial_countdown_matches_operation_duration() {
        // operation=4sのとき受理直後のカウントダウンは4
        let (coord, _stats) = coordinator(4000, 500, 10);

        assert!(coord.submit(WasteCategory::PlasticBottle));

        let status = coord.status();
        assert_eq!(status.phase, Phase::Operating);
        assert_eq!(status.countdown, 4);
    }

    #[test]
    fn test_tick_is_idempotent_without_time_advance() {
        let (coord, _stats) = coordinator(60_000, 1000, 10);

        coord.submit(WasteCategory::Paper);

        // 壁時計がほぼ進まない連続tickは同一ステータスを返す
        let a = coord.tick();
        let b = coord.tick();
        assert_eq!(a, b);

        // Idle中のtickも無操作
        let (idle_coord, _s) = coordinator(100, 50, 10);
        let a = idle_coord.tick();
        let b = idle_coord.tick();
        assert_eq!(a, b);
        assert_eq!(a.phase, Phase::Idle);
    }

    #[test]
    fn test_phase_sequence_full_cycle() {
        // 短縮スケール: operation=100ms, cooldown=50ms, settle=10ms
        let (coord, stats) = coordinator(100, 50, 10);

        assert!(coord.submit(WasteCategory::Paper));
        assert_eq!(coord.tick().phase, Phase::Operating);

        // Operating終了後はCooldown
        std::thread::sleep(Duration::from_millis(110));
        assert_eq!(coord.tick().phase, Phase::Cooldown);

        // 合計時間経過後はIdleにリセットされ、次のsubmitが受理される
        std::thread::sleep(Duration::from_millis(60));
        let status = coord.tick();
        assert_eq!(status.phase, Phase::Idle);
        assert!(!status.active);

        // この時点でOutcomeはちょうど1件記録済み
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.overall.successes + snapshot.overall.failures, 1);

        assert!(coord.submit(WasteCategory::PlasticBottle));
    }

    #[test]
    fn test_active_clears_only_after_outcome_recorded() {
        // settle(300ms)がoperation+cooldown(60ms)より長いケース:
        // 時間が経過しても駆動完了まではCooldownに留まる
        let (coord, stats) = coordinator(40, 20, 300);

        coord.submit(WasteCategory::Paper);

        std::thread::sleep(Duration::from_millis(100));
        let status = coord.tick();
        assert_eq!(status.phase, Phase::Cooldown);
        assert!(status.active);
        assert_eq!(stats.snapshot().overall.successes, 0);

        // 駆動完了後はIdleへ
        std::thread::sleep(Duration::from_millis(300));
        let status = coord.tick();
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(stats.snapshot().overall.successes, 1);
    }

    #[test]
    fn test_exactly_one_outcome_per_accepted_submission() {
        let (coord, stats) = coordinator(30, 10, 5);

        // 2サイクル実行（ビジー中の拒否を挟む）
        for _ in 0..2 {
            assert!(coord.submit(WasteCategory::Paper));
            assert!(!coord.submit(WasteCategory::Paper));

            // サイクル完了まで待機
            loop {
                if !coord.tick().active {
                    break;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.overall.triggers, 2);
        assert_eq!(snapshot.overall.successes + snapshot.overall.failures, 2);
    }

    #[test]
    fn test_status_does_not_mutate() {
        let (coord, _stats) = coordinator(50, 20, 5);
        coord.submit(WasteCategory::Paper);

        std::thread::sleep(Duration::from_millis(120));

        // statusは何度呼んでもフェーズを進めない（tickのみが進める）
        let before = coord.status();
        let again = coord.status();
        assert_eq!(before, again);
        assert_eq!(before.phase, Phase::Operating);
    }
}
