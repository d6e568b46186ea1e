// Services Layer
// 比較・包含切り替え・スクリプト生成・発行・パッケージ操作を実行するサービス層

pub mod include_exclude;
pub mod operation_registry;
pub mod operation_runner;
pub mod package_operations;
pub mod publish;
pub mod schema_compare;
pub mod schema_compare_api;
pub mod schema_compare_provider;
pub mod schema_diff_detector;
pub mod script_generation;
