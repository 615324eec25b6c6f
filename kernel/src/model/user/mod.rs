use crate::model::{id::UserId, role::Role};
pub mod event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
}

// イベント主催者の表示用情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOrganizer {
    pub organizer_id: UserId,
    pub organizer_name: String,
    pub email: String,
}

// 参加者一覧に載せるユーザー情報。認証情報は含めない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeUser {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<&User> for AttendeeUser {
    fn from(value: &User) -> Self {
        Self {
            user_id: value.user_id,
            user_name: value.user_name.clone(),
            email: value.email.clone(),
        }
    }
}

impl From<&User> for EventOrganizer {
    fn from(value: &User) -> Self {
        Self {
            organizer_id: value.user_id,
            organizer_name: value.user_name.clone(),
            email: value.email.clone(),
        }
    }
}
