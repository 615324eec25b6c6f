use crate::model::{attendee::AttendeeView, id::EventId};
use async_trait::async_trait;
use shared::error::AppResult;

// 読み取り専用。イベントが存在しない場合は EventNotFound
#[async_trait]
pub trait RosterRepository: Send + Sync {
    async fn find_by_event_id(&self, event_id: EventId) -> AppResult<Vec<AttendeeView>>;
}
