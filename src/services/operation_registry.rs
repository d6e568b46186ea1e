// 操作レジストリ
//
// 操作IDと比較結果の対応を保持するプロセス内ストア。
// マップ自体はRwLockで並行に参照・登録でき、比較結果ごとに個別のMutexを持つため、
// 異なる操作IDへの変更は互いに待ち合わせません。

use crate::core::error::CompareError;
use crate::core::operation::OperationId;
use crate::core::schema_diff::ComparisonResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// 操作ごとの比較結果（操作単位の排他スコープ）
pub type SharedResult = Arc<Mutex<ComparisonResult>>;

/// 操作レジストリ
///
/// エントリは暗黙に削除されません。後始末は呼び出し側が `remove` で行います。
#[derive(Debug, Default)]
pub struct OperationRegistry {
    sequence: AtomicU64,
    entries: RwLock<HashMap<OperationId, SharedResult>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい操作IDを採番（単調増加）
    pub fn next_id(&self) -> OperationId {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        OperationId::from_sequence(sequence)
    }

    /// 比較結果を新しい操作IDで登録
    pub async fn register(&self, result: ComparisonResult) -> OperationId {
        let operation_id = self.next_id();
        self.insert(operation_id.clone(), result).await;
        operation_id
    }

    /// 指定した操作IDで比較結果を登録
    pub async fn insert(&self, operation_id: OperationId, result: ComparisonResult) {
        let mut entries = self.entries.write().await;
        entries.insert(operation_id.clone(), Arc::new(Mutex::new(result)));
        debug!(operation_id = %operation_id, "Registered comparison result");
    }

    /// 既存の操作IDの比較結果を新しい結果で置き換える
    ///
    /// 操作単位のロックを取ってから内容を差し替えるため、
    /// 実行中の包含切り替えとは直列化されます。
    /// 未登録のIDは採番済みIDとの衝突を避けるため `OperationNotFound` です。
    pub async fn replace(
        &self,
        operation_id: &OperationId,
        result: ComparisonResult,
    ) -> Result<(), CompareError> {
        let shared = self.get(operation_id).await?;
        let mut current = shared.lock().await;
        *current = result;
        debug!(operation_id = %operation_id, "Superseded comparison result");
        Ok(())
    }

    /// 操作IDに対応する比較結果を取得
    pub async fn get(&self, operation_id: &OperationId) -> Result<SharedResult, CompareError> {
        self.entries
            .read()
            .await
            .get(operation_id)
            .cloned()
            .ok_or_else(|| CompareError::OperationNotFound {
                operation_id: operation_id.to_string(),
            })
    }

    /// 比較結果のスナップショットを取得
    pub async fn snapshot(&self, operation_id: &OperationId) -> Result<ComparisonResult, CompareError> {
        let shared = self.get(operation_id).await?;
        let result = shared.lock().await.clone();
        Ok(result)
    }

    /// 操作を削除
    ///
    /// # Returns
    ///
    /// 登録されていた場合はtrue
    pub async fn remove(&self, operation_id: &OperationId) -> bool {
        self.entries.write().await.remove(operation_id).is_some()
    }

    /// 登録されている操作数
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::EndpointDescriptor;
    use crate::core::schema::Table;
    use crate::core::schema_diff::Difference;

    fn result_with(tables: &[&str]) -> ComparisonResult {
        ComparisonResult::new(
            EndpointDescriptor::package("src.dacpac"),
            EndpointDescriptor::package("dst.dacpac"),
            None,
            tables
                .iter()
                .map(|name| Difference::table_added(&Table::new(*name)))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = OperationRegistry::new();
        let id = registry.register(result_with(&["table1"])).await;

        let shared = registry.get(&id).await.unwrap();
        assert_eq!(shared.lock().await.len(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = OperationRegistry::new();
        let a = registry.register(result_with(&[])).await;
        let b = registry.register(result_with(&[])).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unknown_id_is_operation_not_found() {
        let registry = OperationRegistry::new();
        let err = registry.get(&OperationId::from("op-404")).await.unwrap_err();
        assert!(err.is_operation_not_found());
    }

    #[tokio::test]
    async fn test_replace_supersedes_existing_result() {
        let registry = OperationRegistry::new();
        let id = registry.register(result_with(&["table1", "table2"])).await;
        let handle = registry.get(&id).await.unwrap();
        handle.lock().await.set_included(0, false);

        registry
            .replace(&id, result_with(&["table1", "table2"]))
            .await
            .unwrap();

        // 既存のハンドルからも新しい結果が見える
        let current = handle.lock().await;
        assert_eq!(current.included_count(), 2);
    }

    #[tokio::test]
    async fn test_replace_unknown_id_does_not_register() {
        let registry = OperationRegistry::new();
        let err = registry
            .replace(&OperationId::from_sequence(1), result_with(&["table1"]))
            .await
            .unwrap_err();
        assert!(err.is_operation_not_found());
        assert!(registry.is_empty().await);

        // 採番されたIDは別の結果を上書きしない
        let id = registry.register(result_with(&[])).await;
        assert_eq!(id, OperationId::from_sequence(1));
        assert!(registry.get(&id).await.unwrap().lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = OperationRegistry::new();
        let id = registry.register(result_with(&[])).await;
        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.is_empty().await);
    }
}
