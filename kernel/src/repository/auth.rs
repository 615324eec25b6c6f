use crate::model::{
    auth::{AccessToken, CreateToken},
    id::UserId,
};
use async_trait::async_trait;
use shared::error::AppResult;

// トークンの発行・検証は外部の認証基盤の責務。ここでは参照用の窓口だけを定義する
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn fetch_user_id_from_token(&self, access_token: &AccessToken)
        -> AppResult<Option<UserId>>;
    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken>;
}
