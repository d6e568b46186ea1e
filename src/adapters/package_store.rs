// パッケージストア
//
// スキーマパッケージファイルの読み書きを行います。
// 読み込み時にはフォーマットとチェックサムを検証します。

use crate::core::error::CompareError;
use crate::core::package::SchemaPackage;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// パッケージの読み書きインターフェース
pub trait PackageStore: Send + Sync {
    /// パッケージを読み込む
    ///
    /// 存在しない・読めない・壊れている・チェックサムが一致しないファイルはI/Oエラー。
    fn read(&self, path: &Path) -> Result<SchemaPackage, CompareError>;

    /// パッケージを書き込む（親ディレクトリは必要に応じて作成）
    fn write(&self, path: &Path, package: &SchemaPackage) -> Result<(), CompareError>;
}

/// JSONファイルとして保存するパッケージストア
#[derive(Debug, Clone, Default)]
pub struct FilePackageStore {}

impl FilePackageStore {
    pub fn new() -> Self {
        Self {}
    }
}

impl PackageStore for FilePackageStore {
    fn read(&self, path: &Path) -> Result<SchemaPackage, CompareError> {
        let shown = path.display().to_string();
        debug!(path = %shown, "Reading package");

        let content = fs::read_to_string(path).map_err(|e| CompareError::io(&shown, e))?;
        let package: SchemaPackage = serde_json::from_str(&content)
            .map_err(|e| CompareError::io(&shown, format!("invalid package format: {}", e)))?;

        if !package.verify_checksum() {
            return Err(CompareError::io(
                &shown,
                "checksum mismatch (package is corrupt or was modified)",
            ));
        }

        Ok(package)
    }

    fn write(&self, path: &Path, package: &SchemaPackage) -> Result<(), CompareError> {
        let shown = path.display().to_string();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CompareError::io(&shown, e))?;
            }
        }

        let content = serde_json::to_string_pretty(package)
            .map_err(|e| CompareError::io(&shown, e))?;
        fs::write(path, content).map_err(|e| CompareError::io(&shown, e))?;

        info!(
            path = %shown,
            tables = package.schema.table_count(),
            rows = package.total_rows(),
            "Package written"
        );
        Ok(())
    }
}
