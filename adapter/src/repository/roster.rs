use async_trait::async_trait;
use derive_new::new;
use kernel::model::{attendee::AttendeeView, id::EventId};
use kernel::repository::roster::RosterRepository;
use shared::error::{AppError, AppResult};
use sqlx::PgPool;

use crate::database::{model::attendee::AttendeeViewRow, ConnectionPool};

#[derive(new)]
pub struct RosterRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl RosterRepository for RosterRepositoryImpl {
    async fn find_by_event_id(&self, event_id: EventId) -> AppResult<Vec<AttendeeView>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(self.db.inner_ref())
                .await
                .map_err(AppError::SpecificOperationError)?;
        if !exists {
            return Err(AppError::EventNotFound);
        }

        fetch_attendee_views(self.db.inner_ref(), &[event_id])
            .await?
            .into_iter()
            .map(AttendeeView::try_from)
            .collect()
    }
}

// 指定イベント群のアクティブな参加者を、users と結合して登録順に取得する
// イベント一覧の取得でも使う
pub(crate) async fn fetch_attendee_views(
    pool: &PgPool,
    event_ids: &[EventId],
) -> AppResult<Vec<AttendeeViewRow>> {
    let ids: Vec<uuid::Uuid> = event_ids.iter().map(|id| id.raw()).collect();
    sqlx::query_as::<_, AttendeeViewRow>(
        r#"
            SELECT
                a.event_id,
                a.attendee_id,
                a.user_id,
                u.user_name,
                u.email,
                a.status,
                a.registered_at
            FROM attendees AS a
            INNER JOIN users AS u ON a.user_id = u.user_id
            WHERE a.event_id = ANY($1)
              AND a.status <> 'cancelled'
            ORDER BY a.event_id, a.seq ASC
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(AppError::SpecificOperationError)
}
