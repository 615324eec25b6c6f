use chrono::{DateTime, Utc};
use kernel::model::{
    attendee::{AttendeeStatus, AttendeeView},
    id::{AttendeeId, UserId},
    user::AttendeeUser,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeStatusName {
    Confirmed,
    Waitlist,
    Cancelled,
}

impl From<AttendeeStatus> for AttendeeStatusName {
    fn from(value: AttendeeStatus) -> Self {
        match value {
            AttendeeStatus::Confirmed => Self::Confirmed,
            AttendeeStatus::Waitlist => Self::Waitlist,
            AttendeeStatus::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeUserResponse {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<AttendeeUser> for AttendeeUserResponse {
    fn from(value: AttendeeUser) -> Self {
        let AttendeeUser {
            user_id,
            user_name,
            email,
        } = value;
        Self {
            id: user_id,
            user_name,
            email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeResponse {
    pub attendee_id: AttendeeId,
    pub user: AttendeeUserResponse,
    pub status: AttendeeStatusName,
    pub registration_date: DateTime<Utc>,
}

impl From<AttendeeView> for AttendeeResponse {
    fn from(value: AttendeeView) -> Self {
        let AttendeeView {
            attendee_id,
            user,
            status,
            registered_at,
        } = value;
        Self {
            attendee_id,
            user: user.into(),
            status: status.into(),
            registration_date: registered_at,
        }
    }
}
