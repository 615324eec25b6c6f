use crate::model::{
    event::{
        event::{CreateEvent, DeleteEvent, UpdateEvent},
        Event,
    },
    id::EventId,
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId>;
    // 開始日時の昇順で全件取得する
    async fn find_all(&self) -> AppResult<Vec<Event>>;
    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>>;
    // 主催者本人のみ更新できる。確定済みの参加者数より小さい定員は拒否する
    async fn update(&self, event: UpdateEvent) -> AppResult<()>;
    // 主催者本人のみ削除できる
    async fn delete(&self, event: DeleteEvent) -> AppResult<()>;
}
