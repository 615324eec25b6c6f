use crate::model::id::UserId;

// 認証そのものは外部の仕組みが担う。ここでは発行済みトークンの受け渡しのみ扱う
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(pub String);

pub struct CreateToken {
    pub user_id: UserId,
    pub access_token: AccessToken,
}

impl CreateToken {
    pub fn new(user_id: UserId) -> Self {
        let access_token = AccessToken(uuid::Uuid::new_v4().simple().to_string());
        Self {
            user_id,
            access_token,
        }
    }
}
