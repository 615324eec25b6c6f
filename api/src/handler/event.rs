use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{
    event::event::{CreateEvent, DeleteEvent, UpdateEvent},
    id::EventId,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::{AppJson, AuthorizedUser},
    model::{
        envelope::ApiResponse,
        event::{
            CreateEventRequestWithOrganizer, EventRequest, EventResponse,
            UpdateEventRequestWithIds,
        },
    },
};

pub async fn register_event(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    AppJson(req): AppJson<EventRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<EventResponse>>)> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    let create_event = CreateEvent::try_from(CreateEventRequestWithOrganizer::new(user.id(), req))?;
    let event_id = registry.event_repository().create(create_event).await?;
    tracing::info!(%event_id, organizer_id = %user.id(), "event created");

    let event = registry
        .event_repository()
        .find_by_id(event_id)
        .await?
        .ok_or(AppError::EventNotFound)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Event created successfully",
            event.into(),
        )),
    ))
}

// 一覧はログインなしで見られる
pub async fn show_event_list(
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ApiResponse<Vec<EventResponse>>>> {
    registry
        .event_repository()
        .find_all()
        .await
        .map(|events| events.into_iter().map(EventResponse::from).collect())
        .map(ApiResponse::ok)
        .map(Json)
}

pub async fn show_event(
    _user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ApiResponse<EventResponse>>> {
    registry
        .event_repository()
        .find_by_id(event_id)
        .await
        .and_then(|event| match event {
            Some(event) => Ok(Json(ApiResponse::ok(event.into()))),
            None => Err(AppError::EventNotFound),
        })
}

pub async fn update_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
    AppJson(req): AppJson<EventRequest>,
) -> AppResult<Json<ApiResponse<EventResponse>>> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    let update_event =
        UpdateEvent::try_from(UpdateEventRequestWithIds::new(event_id, user.id(), req))?;
    registry.event_repository().update(update_event).await?;
    tracing::info!(%event_id, organizer_id = %user.id(), "event updated");

    let event = registry
        .event_repository()
        .find_by_id(event_id)
        .await?
        .ok_or(AppError::EventNotFound)?;
    Ok(Json(ApiResponse::with_message(
        "Event updated successfully",
        event.into(),
    )))
}

pub async fn delete_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ApiResponse<()>>> {
    registry
        .event_repository()
        .delete(DeleteEvent::new(event_id, user.id()))
        .await?;
    tracing::info!(%event_id, organizer_id = %user.id(), "event deleted");
    Ok(Json(ApiResponse::message_only("Event deleted successfully")))
}
