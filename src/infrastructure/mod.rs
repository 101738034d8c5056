//! Infrastructure層: 外部技術の統合
//!
//! Domain層のtraitを実装し、外部デバイス（ESP8266のHTTPサーボ
//! コントローラー・外部分類器）と接続する。

pub mod http_servo;
pub mod mock_detector;
pub mod mock_servo;
