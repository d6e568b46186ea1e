// 命名ポリシー
//
// アプリケーション名と関連パスの単一ソースを提供します。

/// アプリケーション名
pub const APP_NAME: &str = "schemacompare";

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".schemacompare.yaml";

/// パッケージファイルのフォーマットバージョン
pub const PACKAGE_FORMAT_VERSION: &str = "1.0";

/// スキーマのみのパッケージの拡張子
pub const SCHEMA_PACKAGE_EXTENSION: &str = "dacpac";

/// データ込みのパッケージの拡張子
pub const FULL_PACKAGE_EXTENSION: &str = "bacpac";

/// ログレベル指定用の環境変数
pub const LOG_ENV_VAR: &str = "SCHEMACOMPARE_LOG";
