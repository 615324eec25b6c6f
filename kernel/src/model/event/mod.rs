use crate::model::{
    attendee::{AttendeeView, Capacity},
    id::EventId,
    user::EventOrganizer,
};
use chrono::{DateTime, Utc};
use strum::{AsRefStr, EnumString};

#[allow(clippy::module_inception)]
pub mod event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventCategory {
    Academic,
    Social,
    Sports,
    Cultural,
    Technology,
    Other,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: Capacity,
    pub category: EventCategory,
    pub is_private: bool,
    pub waitlist_enabled: bool,
    pub organizer: EventOrganizer,
    // アクティブな参加者のみ、登録順
    pub attendees: Vec<AttendeeView>,
}
