// Adapters
// データベースとファイルシステムへのアクセスを抽象化

pub mod connection_string;
pub mod database;
pub mod database_introspector;
pub mod package_store;
pub mod sql_generator;
pub mod sql_quote;
