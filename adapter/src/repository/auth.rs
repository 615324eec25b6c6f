use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    auth::{AccessToken, CreateToken},
    id::UserId,
};
use kernel::repository::auth::AuthRepository;
use shared::error::{AppError, AppResult};

use crate::database::ConnectionPool;

#[derive(new)]
pub struct AuthRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl AuthRepository for AuthRepositoryImpl {
    async fn fetch_user_id_from_token(
        &self,
        access_token: &AccessToken,
    ) -> AppResult<Option<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            r#"
                SELECT user_id FROM access_tokens WHERE access_token = $1
            "#,
        )
        .bind(&access_token.0)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)
    }

    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken> {
        sqlx::query(
            r#"
                INSERT INTO access_tokens (access_token, user_id) VALUES ($1, $2)
            "#,
        )
        .bind(&event.access_token.0)
        .bind(event.user_id)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(event.access_token)
    }
}
