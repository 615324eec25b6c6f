use kernel::model::{
    attendee::{Attendee, Capacity, Roster},
    id::{EventId, UserId},
};
use shared::error::{AppError, AppResult};
use std::{future::Future, time::Duration};

use crate::database::{
    model::{attendee::AttendeeRow, event::EventLockRow},
    ConnectionPool,
};

pub(crate) type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

// 名簿を変更する処理（参加登録・キャンセル・定員変更）が共通で使う
pub(crate) struct LockedRoster {
    pub organizer_id: UserId,
    pub roster: Roster,
}

pub(crate) async fn begin_serializable(db: &ConnectionPool) -> AppResult<PgTransaction<'_>> {
    let mut tx = db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;
    Ok(tx)
}

// イベント行をロックし、アクティブな参加者を登録順に読み込む
// 名簿の読み込み・判定・書き込みの間に他のリクエストが割り込まないようにする
pub(crate) async fn lock_roster(
    tx: &mut PgTransaction<'_>,
    event_id: EventId,
) -> AppResult<LockedRoster> {
    let event_row = sqlx::query_as::<_, EventLockRow>(
        r#"
            SELECT organizer_id, capacity, waitlist_enabled
            FROM events
            WHERE event_id = $1
            FOR UPDATE
        "#,
    )
    .bind(event_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?
    .ok_or(AppError::EventNotFound)?;

    let entries = sqlx::query_as::<_, AttendeeRow>(
        r#"
            SELECT attendee_id, user_id, status, registered_at, cancelled_at
            FROM attendees
            WHERE event_id = $1
              AND status <> 'cancelled'
            ORDER BY seq ASC
        "#,
    )
    .bind(event_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?
    .into_iter()
    .map(Attendee::try_from)
    .collect::<AppResult<Vec<_>>>()?;

    Ok(LockedRoster {
        organizer_id: event_row.organizer_id,
        roster: Roster::new(
            Capacity::try_from(event_row.capacity)?,
            event_row.waitlist_enabled,
            entries,
        ),
    })
}

pub(crate) async fn update_status(tx: &mut PgTransaction<'_>, attendee: &Attendee) -> AppResult<()> {
    let res = sqlx::query(
        r#"
            UPDATE attendees
            SET status = $2, cancelled_at = $3
            WHERE attendee_id = $1
        "#,
    )
    .bind(attendee.attendee_id)
    .bind(attendee.status.as_ref())
    .bind(attendee.cancelled_at)
    .execute(&mut **tx)
    .await
    .map_err(AppError::SpecificOperationError)?;

    if res.rows_affected() < 1 {
        return Err(AppError::NoRowsAffectedError(
            "No attendee record has been updated".into(),
        ));
    }
    Ok(())
}

// 競合（シリアライズ失敗・デッドロック・一意制約違反）の場合は最初からやり直す
// 各試行は独立したトランザクションなので、二重に反映されることはない
pub(crate) async fn with_conflict_retry<T, F, Fut>(
    max_retries: u32,
    event_id: EventId,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = max_retries.saturating_add(1);
    for attempt in 1..=max_attempts {
        match op().await {
            Err(e) if e.is_storage_conflict() => {
                tracing::warn!(
                    %event_id,
                    attempt,
                    max_attempts,
                    error.message = %e,
                    "storage conflict on roster update"
                );
                if attempt < max_attempts {
                    tokio::time::sleep(backoff(attempt)).await;
                }
            }
            res => return res,
        }
    }
    Err(AppError::StorageConflict(max_attempts))
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(5 * u64::from(attempt))
}
