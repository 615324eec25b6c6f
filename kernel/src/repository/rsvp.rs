use crate::model::{
    attendee::{Admission, Withdrawal},
    event::event::{CancelAttendee, RegisterAttendee},
};
use async_trait::async_trait;
use shared::error::AppResult;

// 参加者名簿を変更できるのはこのリポジトリだけ
// 定員チェックと追加（キャンセルと繰り上げ）はイベント単位で不可分に実行すること
#[async_trait]
pub trait RsvpRepository: Send + Sync {
    async fn register(&self, event: RegisterAttendee) -> AppResult<Admission>;
    async fn cancel(&self, event: CancelAttendee) -> AppResult<Withdrawal>;
}
