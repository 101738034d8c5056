//! Application層: パイプライン・調停ロジック
//!
//! Domain層のポートを介して検出結果を受け取り、サーボ駆動の調停と
//! 統計収集を行う。外部技術の詳細には依存しない。

pub mod actuator;
pub mod coordinator;
pub mod pipeline;
pub mod selection;
pub mod stats;
