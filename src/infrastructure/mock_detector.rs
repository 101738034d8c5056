//! モック検出アダプタ
//!
//! テスト・開発用の検出ストリームモック実装。
//! 事前に用意した検出列を1フレームずつ返し、尽きたらストリーム終了
//! （Ok(None)）を返す。

use crate::domain::{Detection, DetectorPort, DomainResult};
use std::collections::VecDeque;
use std::time::Duration;

/// モック検出アダプタ
pub struct MockDetectorAdapter {
    frames: VecDeque<Vec<Detection>>,
    frame_delay: Duration,
}

impl MockDetectorAdapter {
    /// 新しいモック検出アダプタを作成
    ///
    /// # Arguments
    /// - `frames`: 返却する検出列（1要素 = 1フレーム）
    /// - `frame_delay`: フレーム間の遅延（フレームレートの模擬）
    pub fn new(frames: Vec<Vec<Detection>>, frame_delay: Duration) -> Self {
        Self {
            frames: frames.into(),
            frame_delay,
        }
    }
}

impl DetectorPort for MockDetectorAdapter {
    fn next_frame(&mut self) -> DomainResult<Option<Vec<Detection>>> {
        match self.frames.pop_front() {
            Some(frame) => {
                std::thread::sleep(self.frame_delay);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}
