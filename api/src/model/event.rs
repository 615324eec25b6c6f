use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    attendee::Capacity,
    event::{
        event::{CreateEvent, UpdateEvent},
        Event, EventCategory,
    },
    id::{EventId, UserId},
    user::EventOrganizer,
};
use serde::{Deserialize, Deserializer, Serialize};
use shared::error::{AppError, AppResult};

use super::attendee::AttendeeResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategoryName {
    Academic,
    Social,
    Sports,
    Cultural,
    Technology,
    Other,
}

impl From<EventCategory> for EventCategoryName {
    fn from(value: EventCategory) -> Self {
        match value {
            EventCategory::Academic => Self::Academic,
            EventCategory::Social => Self::Social,
            EventCategory::Sports => Self::Sports,
            EventCategory::Cultural => Self::Cultural,
            EventCategory::Technology => Self::Technology,
            EventCategory::Other => Self::Other,
        }
    }
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

fn known_category(value: &str, _context: &()) -> garde::Result {
    value.parse::<EventCategory>().map(|_| ()).map_err(|_| {
        garde::Error::new("must be one of academic, social, sports, cultural, technology, other")
    })
}

// 作成と更新（全項目の置き換え）で共通のリクエストボディ
// 欠けた項目はデフォルト値で受け取り、garde 側で項目ごとのエラーにする
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(min = 1))]
    pub title: String,
    #[serde(default)]
    #[garde(length(min = 20))]
    pub description: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(min = 1))]
    pub location: String,
    #[serde(default)]
    #[garde(required)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[garde(range(min = 1, max = 1_000_000))]
    pub capacity: i64,
    #[serde(default)]
    #[garde(custom(known_category))]
    pub category: String,
    #[serde(default)]
    #[garde(skip)]
    pub is_private: bool,
    #[serde(default)]
    #[garde(skip)]
    pub waitlist_enabled: bool,
}

// 検証済みの値をドメインの型に変換する
struct EventFields {
    title: String,
    description: String,
    location: String,
    starts_at: DateTime<Utc>,
    capacity: Capacity,
    category: EventCategory,
    is_private: bool,
    waitlist_enabled: bool,
}

impl TryFrom<EventRequest> for EventFields {
    type Error = AppError;

    fn try_from(value: EventRequest) -> AppResult<Self> {
        let EventRequest {
            title,
            description,
            location,
            starts_at,
            capacity,
            category,
            is_private,
            waitlist_enabled,
        } = value;
        let starts_at = starts_at
            .ok_or_else(|| AppError::UnprocessableEntity("Event date is required".into()))?;
        let capacity = u32::try_from(capacity)
            .map_err(|_| AppError::UnprocessableEntity("Valid capacity is required".into()))
            .and_then(Capacity::new)?;
        let category = category
            .parse::<EventCategory>()
            .map_err(|_| AppError::UnprocessableEntity(format!("unknown category: {category}")))?;
        Ok(Self {
            title,
            description,
            location,
            starts_at,
            capacity,
            category,
            is_private,
            waitlist_enabled,
        })
    }
}

#[derive(new)]
pub struct CreateEventRequestWithOrganizer(UserId, EventRequest);

impl TryFrom<CreateEventRequestWithOrganizer> for CreateEvent {
    type Error = AppError;

    fn try_from(value: CreateEventRequestWithOrganizer) -> AppResult<Self> {
        let CreateEventRequestWithOrganizer(organizer_id, req) = value;
        let fields = EventFields::try_from(req)?;
        Ok(CreateEvent {
            title: fields.title,
            description: fields.description,
            location: fields.location,
            starts_at: fields.starts_at,
            capacity: fields.capacity,
            category: fields.category,
            is_private: fields.is_private,
            waitlist_enabled: fields.waitlist_enabled,
            organizer_id,
        })
    }
}

#[derive(new)]
pub struct UpdateEventRequestWithIds(EventId, UserId, EventRequest);

impl TryFrom<UpdateEventRequestWithIds> for UpdateEvent {
    type Error = AppError;

    fn try_from(value: UpdateEventRequestWithIds) -> AppResult<Self> {
        let UpdateEventRequestWithIds(event_id, requested_user, req) = value;
        let fields = EventFields::try_from(req)?;
        Ok(UpdateEvent {
            event_id,
            requested_user,
            title: fields.title,
            description: fields.description,
            location: fields.location,
            starts_at: fields.starts_at,
            capacity: fields.capacity,
            category: fields.category,
            is_private: fields.is_private,
            waitlist_enabled: fields.waitlist_enabled,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOrganizerResponse {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<EventOrganizer> for EventOrganizerResponse {
    fn from(value: EventOrganizer) -> Self {
        let EventOrganizer {
            organizer_id,
            organizer_name,
            email,
        } = value;
        Self {
            id: organizer_id,
            user_name: organizer_name,
            email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: u32,
    pub category: EventCategoryName,
    pub is_private: bool,
    pub waitlist_enabled: bool,
    pub organizer: EventOrganizerResponse,
    pub attendees: Vec<AttendeeResponse>,
}

impl From<Event> for EventResponse {
    fn from(value: Event) -> Self {
        let Event {
            event_id,
            title,
            description,
            location,
            starts_at,
            capacity,
            category,
            is_private,
            waitlist_enabled,
            organizer,
            attendees,
        } = value;
        Self {
            id: event_id,
            title,
            description,
            location,
            starts_at,
            capacity: capacity.get(),
            category: category.into(),
            is_private,
            waitlist_enabled,
            organizer: organizer.into(),
            attendees: attendees.into_iter().map(AttendeeResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> serde_json::Value {
        json!({
            "title": "Chess club",
            "description": "Weekly casual games, all levels welcome.",
            "location": "Library",
            "startsAt": "2030-04-01T18:00:00Z",
            "capacity": 16,
            "category": "social"
        })
    }

    #[test]
    fn blank_title_is_trimmed_then_rejected() {
        let mut raw = body();
        raw["title"] = json!("   ");
        let req: EventRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.title, "");
        let report = req.validate(&()).unwrap_err();
        assert!(report.iter().any(|(path, _)| path.to_string() == "title"));
    }

    #[test]
    fn title_is_stored_trimmed() {
        let mut raw = body();
        raw["title"] = json!("  Chess club  ");
        let req: EventRequest = serde_json::from_value(raw).unwrap();
        req.validate(&()).unwrap();
        let event =
            CreateEvent::try_from(CreateEventRequestWithOrganizer::new(UserId::new(), req))
                .unwrap();
        assert_eq!(event.title, "Chess club");
        assert_eq!(event.category, EventCategory::Social);
    }

    #[test]
    fn missing_and_unknown_fields_are_reported_per_field() {
        let req: EventRequest =
            serde_json::from_value(json!({ "category": "party" })).unwrap();
        let report = req.validate(&()).unwrap_err();
        let paths: Vec<String> = report.iter().map(|(path, _)| path.to_string()).collect();
        for field in ["title", "description", "location", "starts_at", "capacity", "category"] {
            assert!(paths.iter().any(|p| p == field), "{field} missing from {paths:?}");
        }
    }
}
