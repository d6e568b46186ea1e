// 包含/除外の状態遷移
//
// 差分エントリを識別子（名前 + 種別 + 変更種別）で比較結果の差分に突き合わせ、
// その差分の包含フラグだけを変更します。

use crate::core::error::CompareError;
use crate::core::operation::OperationId;
use crate::core::schema_diff::{ComparisonResult, DiffEntry};
use crate::services::operation_registry::OperationRegistry;
use tracing::debug;

/// 包含フラグを設定
///
/// 子エントリ（カラムなど）を指定した場合は、それを内包するテーブル単位で切り替わります。
/// 他の差分のフラグは変更しません。
///
/// # Arguments
///
/// * `result` - 対象の比較結果
/// * `entry` - 切り替える差分エントリ（位置ではなく識別子で照合）
/// * `included` - 包含するかどうか
///
/// # Returns
///
/// 切り替えた差分の位置。一致する差分がなければ EntryNotFound
pub fn set_inclusion(
    result: &mut ComparisonResult,
    entry: &DiffEntry,
    included: bool,
) -> Result<usize, CompareError> {
    let index = result.find(entry).ok_or_else(|| CompareError::EntryNotFound {
        entry: entry.label(),
    })?;

    result.set_included(index, included);
    debug!(entry = %entry.label(), included, "Inclusion changed");
    Ok(index)
}

/// レジストリ上の比較結果の包含フラグを設定
///
/// 操作単位のロック内で変更するため、同じ操作IDへの切り替えは直列化されます。
///
/// # Returns
///
/// 変更後のエントリと包含されている差分の数
pub async fn set_inclusion_for_operation(
    registry: &OperationRegistry,
    operation_id: &OperationId,
    entry: &DiffEntry,
    included: bool,
) -> Result<(DiffEntry, usize), CompareError> {
    let shared = registry.get(operation_id).await?;
    let mut result = shared.lock().await;

    let index = set_inclusion(&mut result, entry, included)
        .map_err(|e| e.with_context(format!("operation {}", operation_id)))?;

    let entries = result.entries();
    let affected = entries
        .into_iter()
        .nth(index)
        .ok_or_else(|| CompareError::EntryNotFound {
            entry: entry.label(),
        })?;
    Ok((affected, result.included_count()))
}
