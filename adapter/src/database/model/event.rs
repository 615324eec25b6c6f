use kernel::model::{
    attendee::{AttendeeView, Capacity},
    event::{Event, EventCategory},
    id::{EventId, UserId},
    user::EventOrganizer,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct EventRow {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: i32,
    pub category: String,
    pub is_private: bool,
    pub waitlist_enabled: bool,
    pub organizer_id: UserId,
    pub organizer_name: String,
    pub organizer_email: String,
}

// 参加者一覧は別クエリで取得するため、From の代わりに into_event で受け取る
impl EventRow {
    pub fn into_event(self, attendees: Vec<AttendeeView>) -> Result<Event, AppError> {
        let EventRow {
            event_id,
            title,
            description,
            location,
            starts_at,
            capacity,
            category,
            is_private,
            waitlist_enabled,
            organizer_id,
            organizer_name,
            organizer_email,
        } = self;
        let category: EventCategory = category
            .parse()
            .map_err(|_| AppError::ConversionEntityError(format!("unknown category: {category}")))?;
        Ok(Event {
            event_id,
            title,
            description,
            location,
            starts_at,
            capacity: Capacity::try_from(capacity)?,
            category,
            is_private,
            waitlist_enabled,
            organizer: EventOrganizer {
                organizer_id,
                organizer_name,
                email: organizer_email,
            },
            attendees,
        })
    }
}

// 名簿を変更する際、行ロックを取って読み込む型
#[derive(sqlx::FromRow)]
pub struct EventLockRow {
    pub organizer_id: UserId,
    pub capacity: i32,
    pub waitlist_enabled: bool,
}
