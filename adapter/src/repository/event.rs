use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    attendee::AttendeeView,
    event::{
        event::{CreateEvent, DeleteEvent, UpdateEvent},
        Event,
    },
    id::EventId,
};
use kernel::repository::event::EventRepository;
use shared::{
    config::RsvpConfig,
    error::{AppError, AppResult},
};
use std::collections::HashMap;

use super::{
    guard::{begin_serializable, lock_roster, update_status, with_conflict_retry},
    roster::fetch_attendee_views,
};
use crate::database::{model::event::EventRow, ConnectionPool};

#[derive(new)]
pub struct EventRepositoryImpl {
    db: ConnectionPool,
    config: RsvpConfig,
}

fn not_found_or_unauthorized() -> AppError {
    AppError::EntityNotFound("Event not found or unauthorized".into())
}

const SELECT_EVENTS: &str = r#"
    SELECT
        e.event_id,
        e.title,
        e.description,
        e.location,
        e.starts_at,
        e.capacity,
        e.category,
        e.is_private,
        e.waitlist_enabled,
        e.organizer_id,
        u.user_name AS organizer_name,
        u.email AS organizer_email
    FROM events AS e
    INNER JOIN users AS u ON e.organizer_id = u.user_id
"#;

#[async_trait]
impl EventRepository for EventRepositoryImpl {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId> {
        let event_id = EventId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO events
                (event_id, organizer_id, title, description, location,
                starts_at, capacity, category, is_private, waitlist_enabled)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event_id)
        .bind(event.organizer_id)
        .bind(event.title)
        .bind(event.description)
        .bind(event.location)
        .bind(event.starts_at)
        .bind(i32::from(event.capacity))
        .bind(event.category.as_ref())
        .bind(event.is_private)
        .bind(event.waitlist_enabled)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been created".into(),
            ));
        }

        Ok(event_id)
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        let rows: Vec<EventRow> =
            sqlx::query_as(&format!("{SELECT_EVENTS} ORDER BY e.starts_at ASC"))
                .fetch_all(self.db.inner_ref())
                .await
                .map_err(AppError::SpecificOperationError)?;

        let event_ids: Vec<EventId> = rows.iter().map(|row| row.event_id).collect();
        let mut attendees: HashMap<EventId, Vec<AttendeeView>> = HashMap::new();
        for row in fetch_attendee_views(self.db.inner_ref(), &event_ids).await? {
            let event_id = row.event_id;
            attendees
                .entry(event_id)
                .or_default()
                .push(AttendeeView::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let list = attendees.remove(&row.event_id).unwrap_or_default();
                row.into_event(list)
            })
            .collect()
    }

    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("{SELECT_EVENTS} WHERE e.event_id = $1"))
                .bind(event_id)
                .fetch_optional(self.db.inner_ref())
                .await
                .map_err(AppError::SpecificOperationError)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let attendees = fetch_attendee_views(self.db.inner_ref(), &[event_id])
            .await?
            .into_iter()
            .map(AttendeeView::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        row.into_event(attendees).map(Some)
    }

    async fn update(&self, event: UpdateEvent) -> AppResult<()> {
        with_conflict_retry(self.config.max_conflict_retries, event.event_id, || {
            self.try_update(&event)
        })
        .await
    }

    async fn delete(&self, event: DeleteEvent) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                DELETE FROM events
                WHERE event_id = $1 AND organizer_id = $2
            "#,
        )
        .bind(event.event_id)
        .bind(event.requested_user)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(not_found_or_unauthorized());
        }

        Ok(())
    }
}

impl EventRepositoryImpl {
    // 定員の変更は参加登録と同じくイベント行のロックの中で判定する
    async fn try_update(&self, event: &UpdateEvent) -> AppResult<()> {
        let mut tx = begin_serializable(&self.db).await?;

        let mut roster = match lock_roster(&mut tx, event.event_id).await {
            Ok(locked) if locked.organizer_id == event.requested_user => locked.roster,
            Ok(_) | Err(AppError::EventNotFound) => return Err(not_found_or_unauthorized()),
            Err(e) => return Err(e),
        };
        let promoted = roster.reconfigure(event.capacity, event.waitlist_enabled)?;

        sqlx::query(
            r#"
                UPDATE events
                SET title = $2,
                    description = $3,
                    location = $4,
                    starts_at = $5,
                    capacity = $6,
                    category = $7,
                    is_private = $8,
                    waitlist_enabled = $9,
                    updated_at = CURRENT_TIMESTAMP(3)
                WHERE event_id = $1
            "#,
        )
        .bind(event.event_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(i32::from(event.capacity))
        .bind(event.category.as_ref())
        .bind(event.is_private)
        .bind(event.waitlist_enabled)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        for attendee in &promoted {
            update_status(&mut tx, attendee).await?;
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }
}
