use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    attendee::{Admission, Withdrawal},
    event::event::{CancelAttendee, RegisterAttendee},
};
use kernel::repository::rsvp::RsvpRepository;
use shared::{
    config::RsvpConfig,
    error::{AppError, AppResult},
};

use super::guard::{begin_serializable, lock_roster, update_status, with_conflict_retry};
use crate::database::ConnectionPool;

#[derive(new)]
pub struct RsvpRepositoryImpl {
    db: ConnectionPool,
    config: RsvpConfig,
}

#[async_trait]
impl RsvpRepository for RsvpRepositoryImpl {
    async fn register(&self, event: RegisterAttendee) -> AppResult<Admission> {
        with_conflict_retry(self.config.max_conflict_retries, event.event_id, || {
            self.try_register(event)
        })
        .await
    }

    async fn cancel(&self, event: CancelAttendee) -> AppResult<Withdrawal> {
        with_conflict_retry(self.config.max_conflict_retries, event.event_id, || {
            self.try_cancel(event)
        })
        .await
    }
}

impl RsvpRepositoryImpl {
    // 参加登録を 1 トランザクションで行う
    async fn try_register(&self, event: RegisterAttendee) -> AppResult<Admission> {
        let mut tx = begin_serializable(&self.db).await?;

        let mut roster = lock_roster(&mut tx, event.event_id).await?.roster;
        let admission = roster.admit(event.user_id, event.requested_at)?;

        let attendee = &admission.attendee;
        let res = sqlx::query(
            r#"
                INSERT INTO attendees
                (attendee_id, event_id, user_id, status, registered_at)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(attendee.attendee_id)
        .bind(event.event_id)
        .bind(attendee.user_id)
        .bind(attendee.status.as_ref())
        .bind(attendee.registered_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No attendee record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(admission)
    }

    // キャンセルと、キャンセル待ちの繰り上げを 1 トランザクションで行う
    async fn try_cancel(&self, event: CancelAttendee) -> AppResult<Withdrawal> {
        let mut tx = begin_serializable(&self.db).await?;

        let mut roster = lock_roster(&mut tx, event.event_id).await?.roster;
        let withdrawal = roster.withdraw(event.user_id, event.requested_at)?;

        update_status(&mut tx, &withdrawal.cancelled).await?;
        if let Some(promoted) = &withdrawal.promoted {
            update_status(&mut tx, promoted).await?;
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(withdrawal)
    }
}
