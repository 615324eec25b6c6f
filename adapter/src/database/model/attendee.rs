use kernel::model::{
    attendee::{Attendee, AttendeeStatus, AttendeeView},
    id::{AttendeeId, EventId, UserId},
    user::AttendeeUser,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

fn parse_status(status: &str) -> Result<AttendeeStatus, AppError> {
    status
        .parse()
        .map_err(|_| AppError::ConversionEntityError(format!("unknown attendee status: {status}")))
}

// 定員チェック用に名簿を読み込む際に使う型
#[derive(sqlx::FromRow)]
pub struct AttendeeRow {
    pub attendee_id: AttendeeId,
    pub user_id: UserId,
    pub status: String,
    pub registered_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttendeeRow> for Attendee {
    type Error = AppError;

    fn try_from(value: AttendeeRow) -> Result<Self, Self::Error> {
        let AttendeeRow {
            attendee_id,
            user_id,
            status,
            registered_at,
            cancelled_at,
        } = value;
        Ok(Attendee {
            attendee_id,
            user_id,
            status: parse_status(&status)?,
            registered_at,
            cancelled_at,
        })
    }
}

// 参加者一覧の表示用。users テーブルと結合して取得する
#[derive(sqlx::FromRow)]
pub struct AttendeeViewRow {
    pub event_id: EventId,
    pub attendee_id: AttendeeId,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub status: String,
    pub registered_at: DateTime<Utc>,
}

impl TryFrom<AttendeeViewRow> for AttendeeView {
    type Error = AppError;

    fn try_from(value: AttendeeViewRow) -> Result<Self, Self::Error> {
        let AttendeeViewRow {
            event_id: _,
            attendee_id,
            user_id,
            user_name,
            email,
            status,
            registered_at,
        } = value;
        Ok(AttendeeView {
            attendee_id,
            user: AttendeeUser {
                user_id,
                user_name,
                email,
            },
            status: parse_status(&status)?,
            registered_at,
        })
    }
}
