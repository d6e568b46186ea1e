// Schemacompareライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメインロジック（エンドポイント、スキーマ、差分、操作モデル、パッケージ）
// - adapters: データベースとファイルシステムへのアクセスを抽象化
// - services: 比較、包含切り替え、スクリプト生成、発行、パッケージ操作

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
