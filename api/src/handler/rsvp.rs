use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use kernel::model::{
    attendee::AttendeeStatus,
    event::event::{CancelAttendee, RegisterAttendee},
    id::EventId,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::{
        attendee::AttendeeResponse,
        envelope::ApiResponse,
        event::EventResponse,
    },
};

pub async fn rsvp_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ApiResponse<EventResponse>>> {
    let admission = registry
        .rsvp_repository()
        .register(RegisterAttendee::new(event_id, user.id(), Utc::now()))
        .await
        .inspect_err(|e| {
            tracing::info!(%event_id, user_id = %user.id(), reason = %e, "rsvp rejected");
        })?;
    tracing::info!(
        %event_id,
        user_id = %user.id(),
        status = admission.attendee.status.as_ref(),
        "rsvp accepted"
    );

    let message = match admission.attendee.status {
        AttendeeStatus::Waitlist => "Event is at full capacity, added to the waitlist",
        _ => "Successfully RSVP'd to event",
    };
    let event = find_event(&registry, event_id).await?;
    Ok(Json(ApiResponse::with_message(message, event)))
}

pub async fn cancel_rsvp(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ApiResponse<EventResponse>>> {
    let withdrawal = registry
        .rsvp_repository()
        .cancel(CancelAttendee::new(event_id, user.id(), Utc::now()))
        .await
        .inspect_err(|e| {
            tracing::info!(%event_id, user_id = %user.id(), reason = %e, "rsvp cancellation rejected");
        })?;
    tracing::info!(%event_id, user_id = %user.id(), "rsvp cancelled");
    if let Some(promoted) = &withdrawal.promoted {
        tracing::info!(%event_id, user_id = %promoted.user_id, "promoted from waitlist");
    }

    let event = find_event(&registry, event_id).await?;
    Ok(Json(ApiResponse::with_message(
        "Successfully cancelled RSVP",
        event,
    )))
}

pub async fn show_attendees(
    _user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ApiResponse<Vec<AttendeeResponse>>>> {
    registry
        .roster_repository()
        .find_by_event_id(event_id)
        .await
        .map(|roster| roster.into_iter().map(AttendeeResponse::from).collect())
        .map(ApiResponse::ok)
        .map(Json)
}

// 書き込み直後の状態を読み直して返す
async fn find_event(registry: &AppRegistry, event_id: EventId) -> AppResult<EventResponse> {
    registry
        .event_repository()
        .find_by_id(event_id)
        .await?
        .map(EventResponse::from)
        .ok_or(AppError::EventNotFound)
}
