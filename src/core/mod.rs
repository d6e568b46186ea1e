// Core Domain
// エンドポイント、スキーマモデル、差分モデル、操作モデルなどの純粋なドメインロジック

pub mod config;
pub mod endpoint;
pub mod error;
pub mod naming;
pub mod operation;
pub mod package;
pub mod schema;
pub mod schema_diff;
