//! シーケンス権限付与ユースケース

use std::sync::Arc;

use todolist_domain::user::UserEmail;
use todolist_infra::repository::PermissionRepository;

use crate::error::TodoError;

/// シーケンス権限付与ユースケース
pub struct PermissionUseCaseImpl {
    permission_repository: Arc<dyn PermissionRepository>,
}

impl PermissionUseCaseImpl {
    pub fn new(permission_repository: Arc<dyn PermissionRepository>) -> Self {
        Self {
            permission_repository,
        }
    }

    /// ユーザーのテナントテーブルのシーケンスに権限を付与し、シーケンス名を返す
    ///
    /// テーブル作成後に一度呼べばよい。再実行しても結果は変わらない。
    pub async fn setup_permissions(&self, email: &UserEmail) -> Result<String, TodoError> {
        let sequence = self
            .permission_repository
            .grant_sequence_access(email)
            .await?;
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use todolist_infra::mock::MockPermissionRepository;

    use super::*;

    #[tokio::test]
    async fn test_テナントテーブルのシーケンス名を返す() {
        let repository = MockPermissionRepository::new();
        let sut = PermissionUseCaseImpl::new(Arc::new(repository.clone()));

        let sequence = sut
            .setup_permissions(&UserEmail::new("Jane.Doe@example.com").unwrap())
            .await
            .unwrap();

        assert_eq!(sequence, "jane_doe_lists_id_seq");
        assert_eq!(repository.granted(), vec![sequence]);
    }
}
