use crate::model::{
    attendee::Capacity,
    event::EventCategory,
    id::{EventId, UserId},
};
use chrono::{DateTime, Utc};
use derive_new::new;

#[derive(Debug, new)]
pub struct CreateEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: Capacity,
    pub category: EventCategory,
    pub is_private: bool,
    pub waitlist_enabled: bool,
    pub organizer_id: UserId,
}

// 全項目の置き換え。定員の変更は名簿と同じ排他の中で行う
#[derive(Debug, new)]
pub struct UpdateEvent {
    pub event_id: EventId,
    pub requested_user: UserId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: Capacity,
    pub category: EventCategory,
    pub is_private: bool,
    pub waitlist_enabled: bool,
}

#[derive(Debug, new)]
pub struct DeleteEvent {
    pub event_id: EventId,
    pub requested_user: UserId,
}

#[derive(Debug, Clone, Copy, new)]
pub struct RegisterAttendee {
    pub event_id: EventId,
    pub user_id: UserId,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, new)]
pub struct CancelAttendee {
    pub event_id: EventId,
    pub user_id: UserId,
    pub requested_at: DateTime<Utc>,
}
