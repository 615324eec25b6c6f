use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kernel::model::{
    attendee::{Admission, AttendeeView, Roster, Withdrawal},
    auth::{AccessToken, CreateToken},
    event::{
        event::{CancelAttendee, CreateEvent, DeleteEvent, RegisterAttendee, UpdateEvent},
        Event, EventCategory,
    },
    id::{EventId, UserId},
    user::{event::CreateUser, AttendeeUser, EventOrganizer, User},
};
use kernel::repository::{
    auth::AuthRepository, event::EventRepository, health::HealthCheckRepository,
    roster::RosterRepository, rsvp::RsvpRepository, user::UserRepository,
};
use shared::error::{AppError, AppResult};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

// プロセス内で完結するストレージ。開発時とテストで使う
// イベントごとに Mutex を持ち、名簿の判定と変更はそのロックを保持したまま行う
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    tokens: RwLock<HashMap<AccessToken, UserId>>,
    events: RwLock<HashMap<EventId, Arc<Mutex<EventRecord>>>>,
}

#[derive(Clone)]
struct EventRecord {
    event_id: EventId,
    title: String,
    description: String,
    location: String,
    starts_at: DateTime<Utc>,
    category: EventCategory,
    is_private: bool,
    organizer_id: UserId,
    roster: Roster,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn event_record(&self, event_id: EventId) -> AppResult<Arc<Mutex<EventRecord>>> {
        self.events
            .read()
            .await
            .get(&event_id)
            .cloned()
            .ok_or(AppError::EventNotFound)
    }

    // 名簿のスナップショットを users で展開する
    // ユーザーが見つからないエントリは表示しない
    async fn expand(&self, record: EventRecord) -> AppResult<Event> {
        let users = self.users.read().await;
        let organizer = users
            .get(&record.organizer_id)
            .map(EventOrganizer::from)
            .ok_or_else(|| {
                AppError::ConversionEntityError(format!(
                    "organizer {} of event {} not found",
                    record.organizer_id, record.event_id
                ))
            })?;
        let attendees = expand_roster(&record.roster, &users);
        Ok(Event {
            event_id: record.event_id,
            title: record.title,
            description: record.description,
            location: record.location,
            starts_at: record.starts_at,
            capacity: record.roster.capacity(),
            category: record.category,
            is_private: record.is_private,
            waitlist_enabled: record.roster.waitlist_enabled(),
            organizer,
            attendees,
        })
    }
}

fn not_found_or_unauthorized() -> AppError {
    AppError::EntityNotFound("Event not found or unauthorized".into())
}

fn expand_roster(roster: &Roster, users: &HashMap<UserId, User>) -> Vec<AttendeeView> {
    roster
        .active_entries()
        .filter_map(|a| {
            users.get(&a.user_id).map(|user| AttendeeView {
                attendee_id: a.attendee_id,
                user: AttendeeUser::from(user),
                status: a.status,
                registered_at: a.registered_at,
            })
        })
        .collect()
}

#[async_trait]
impl HealthCheckRepository for InMemoryStore {
    async fn check_db(&self) -> bool {
        true
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, event: CreateUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == event.email) {
            return Err(AppError::UnprocessableEntity(format!(
                "email {} is already in use",
                event.email
            )));
        }
        let user = User {
            user_id: UserId::new(),
            user_name: event.user_name,
            email: event.email,
            role: event.role,
        };
        users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&current_user_id).cloned())
    }
}

#[async_trait]
impl AuthRepository for InMemoryStore {
    async fn fetch_user_id_from_token(
        &self,
        access_token: &AccessToken,
    ) -> AppResult<Option<UserId>> {
        Ok(self.tokens.read().await.get(access_token).copied())
    }

    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken> {
        self.tokens
            .write()
            .await
            .insert(event.access_token.clone(), event.user_id);
        Ok(event.access_token)
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId> {
        let CreateEvent {
            title,
            description,
            location,
            starts_at,
            capacity,
            category,
            is_private,
            waitlist_enabled,
            organizer_id,
        } = event;
        let record = EventRecord {
            event_id: EventId::new(),
            title,
            description,
            location,
            starts_at,
            category,
            is_private,
            organizer_id,
            roster: Roster::new(capacity, waitlist_enabled, Vec::new()),
        };
        let event_id = record.event_id;
        self.events
            .write()
            .await
            .insert(event_id, Arc::new(Mutex::new(record)));
        Ok(event_id)
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        let handles: Vec<Arc<Mutex<EventRecord>>> =
            self.events.read().await.values().cloned().collect();

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            records.push(handle.lock().await.clone());
        }
        records.sort_by_key(|r| r.starts_at);

        let mut events = Vec::with_capacity(records.len());
        for record in records {
            events.push(self.expand(record).await?);
        }
        Ok(events)
    }

    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let handle = match self.event_record(event_id).await {
            Ok(handle) => handle,
            Err(AppError::EventNotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let record = handle.lock().await.clone();
        self.expand(record).await.map(Some)
    }

    async fn update(&self, event: UpdateEvent) -> AppResult<()> {
        let handle = self
            .event_record(event.event_id)
            .await
            .map_err(|_| not_found_or_unauthorized())?;
        // 参加登録と同じロックの中で定員を変更する
        let mut record = handle.lock().await;
        if record.organizer_id != event.requested_user {
            return Err(not_found_or_unauthorized());
        }
        record
            .roster
            .reconfigure(event.capacity, event.waitlist_enabled)?;

        record.title = event.title;
        record.description = event.description;
        record.location = event.location;
        record.starts_at = event.starts_at;
        record.category = event.category;
        record.is_private = event.is_private;
        Ok(())
    }

    async fn delete(&self, event: DeleteEvent) -> AppResult<()> {
        let mut events = self.events.write().await;
        let owned = match events.get(&event.event_id) {
            Some(handle) => handle.lock().await.organizer_id == event.requested_user,
            None => false,
        };
        if !owned {
            return Err(not_found_or_unauthorized());
        }
        events.remove(&event.event_id);
        Ok(())
    }
}

#[async_trait]
impl RsvpRepository for InMemoryStore {
    async fn register(&self, event: RegisterAttendee) -> AppResult<Admission> {
        let handle = self.event_record(event.event_id).await?;
        // 判定から追加まで、このイベントのロックを保持する
        let mut record = handle.lock().await;
        record.roster.admit(event.user_id, event.requested_at)
    }

    async fn cancel(&self, event: CancelAttendee) -> AppResult<Withdrawal> {
        let handle = self.event_record(event.event_id).await?;
        let mut record = handle.lock().await;
        record.roster.withdraw(event.user_id, event.requested_at)
    }
}

#[async_trait]
impl RosterRepository for InMemoryStore {
    async fn find_by_event_id(&self, event_id: EventId) -> AppResult<Vec<AttendeeView>> {
        let handle = self.event_record(event_id).await?;
        let roster = handle.lock().await.roster.clone();
        let users = self.users.read().await;
        Ok(expand_roster(&roster, &users))
    }
}

impl InMemoryStore {
    pub async fn confirmed_count(&self, event_id: EventId) -> AppResult<usize> {
        let handle = self.event_record(event_id).await?;
        let count = handle.lock().await.roster.confirmed_count();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::{
        attendee::{AttendeeStatus, Capacity},
        role::Role,
    };

    async fn setup(capacity: u32, waitlist_enabled: bool) -> anyhow::Result<(Arc<InMemoryStore>, EventId)> {
        let store = Arc::new(InMemoryStore::new());
        let organizer = UserRepository::create(
            store.as_ref(),
            CreateUser::new("organizer".into(), "org@example.com".into(), Role::Admin),
        )
        .await?;
        let event_id = EventRepository::create(
            store.as_ref(),
            CreateEvent::new(
                "Campus tech talk".into(),
                "An evening of short talks about systems.".into(),
                "Room 101".into(),
                Utc::now(),
                Capacity::new(capacity)?,
                EventCategory::Technology,
                false,
                waitlist_enabled,
                organizer.user_id,
            ),
        )
        .await?;
        Ok((store, event_id))
    }

    async fn user(store: &InMemoryStore, name: &str) -> anyhow::Result<UserId> {
        let user = UserRepository::create(
            store,
            CreateUser::new(name.into(), format!("{name}@example.com"), Role::User),
        )
        .await?;
        Ok(user.user_id)
    }

    async fn race_registrations(capacity: u32, requests: usize) -> anyhow::Result<()> {
        let (store, event_id) = setup(capacity, false).await?;

        let mut handles = Vec::with_capacity(requests);
        for i in 0..requests {
            let user_id = user(&store, &format!("user{i}")).await?;
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .register(RegisterAttendee::new(event_id, user_id, Utc::now()))
                    .await
            }));
        }

        let (mut accepted, mut rejected) = (0, 0);
        for handle in handles {
            match handle.await? {
                Ok(_) => accepted += 1,
                Err(AppError::CapacityExceeded) => rejected += 1,
                Err(e) => return Err(e.into()),
            }
        }

        assert_eq!(accepted, capacity as usize);
        assert_eq!(rejected, requests - capacity as usize);
        assert_eq!(store.confirmed_count(event_id).await?, capacity as usize);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_never_exceed_capacity() -> anyhow::Result<()> {
        for (capacity, requests) in [(1, 2), (5, 50), (20, 100)] {
            race_registrations(capacity, requests).await?;
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_requests_admit_once() -> anyhow::Result<()> {
        let (store, event_id) = setup(10, false).await?;
        let user_id = user(&store, "alice").await?;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .register(RegisterAttendee::new(event_id, user_id, Utc::now()))
                    .await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await? {
                Ok(_) => accepted += 1,
                Err(AppError::DuplicateRegistration) => {}
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(store.confirmed_count(event_id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() -> anyhow::Result<()> {
        let (store, _) = setup(1, false).await?;
        let user_id = user(&store, "bob").await?;
        let missing = EventId::new();

        let res = store
            .register(RegisterAttendee::new(missing, user_id, Utc::now()))
            .await;
        assert!(matches!(res, Err(AppError::EventNotFound)));
        let res = store
            .cancel(CancelAttendee::new(missing, user_id, Utc::now()))
            .await;
        assert!(matches!(res, Err(AppError::EventNotFound)));
        let res = store.find_by_event_id(missing).await;
        assert!(matches!(res, Err(AppError::EventNotFound)));
        assert!(store.find_by_id(missing).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn roster_is_expanded_in_registration_order() -> anyhow::Result<()> {
        let (store, event_id) = setup(3, false).await?;
        let names = ["u1", "u2", "u3"];
        for name in names {
            let user_id = user(&store, name).await?;
            store
                .register(RegisterAttendee::new(event_id, user_id, Utc::now()))
                .await?;
        }

        let roster = store.find_by_event_id(event_id).await?;
        let order: Vec<&str> = roster.iter().map(|a| a.user.user_name.as_str()).collect();
        assert_eq!(order, names);
        assert!(roster.iter().all(|a| a.status == AttendeeStatus::Confirmed));
        assert_eq!(roster[0].user.email, "u1@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn cancel_promotes_waitlisted_attendee() -> anyhow::Result<()> {
        let (store, event_id) = setup(1, true).await?;
        let first = user(&store, "first").await?;
        let second = user(&store, "second").await?;
        store
            .register(RegisterAttendee::new(event_id, first, Utc::now()))
            .await?;
        let queued = store
            .register(RegisterAttendee::new(event_id, second, Utc::now()))
            .await?;
        assert_eq!(queued.attendee.status, AttendeeStatus::Waitlist);

        let withdrawal = store
            .cancel(CancelAttendee::new(event_id, first, Utc::now()))
            .await?;
        assert_eq!(withdrawal.promoted.map(|a| a.user_id), Some(second));

        let event = store.find_by_id(event_id).await?.expect("event exists");
        assert_eq!(event.attendees.len(), 1);
        assert_eq!(event.attendees[0].user.user_id, second);
        assert_eq!(event.attendees[0].status, AttendeeStatus::Confirmed);
        Ok(())
    }

    fn update_of(event_id: EventId, requested_user: UserId, capacity: u32) -> anyhow::Result<UpdateEvent> {
        Ok(UpdateEvent::new(
            event_id,
            requested_user,
            "Campus tech talk (moved)".into(),
            "An evening of short talks about systems.".into(),
            "Room 202".into(),
            Utc::now(),
            Capacity::new(capacity)?,
            EventCategory::Technology,
            true,
            false,
        ))
    }

    #[tokio::test]
    async fn only_organizer_can_update() -> anyhow::Result<()> {
        let (store, event_id) = setup(2, false).await?;
        let stranger = user(&store, "stranger").await?;

        let res = store.update(update_of(event_id, stranger, 5)?).await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));
        let res = store.update(update_of(EventId::new(), stranger, 5)?).await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        let organizer = store.find_by_id(event_id).await?.expect("event exists").organizer;
        store
            .update(update_of(event_id, organizer.organizer_id, 5)?)
            .await?;
        let event = store.find_by_id(event_id).await?.expect("event exists");
        assert_eq!(event.capacity.get(), 5);
        assert_eq!(event.location, "Room 202");
        assert!(event.is_private);
        Ok(())
    }

    #[tokio::test]
    async fn capacity_cannot_shrink_below_confirmed() -> anyhow::Result<()> {
        let (store, event_id) = setup(3, false).await?;
        for name in ["u1", "u2"] {
            let user_id = user(&store, name).await?;
            store
                .register(RegisterAttendee::new(event_id, user_id, Utc::now()))
                .await?;
        }
        let organizer = store.find_by_id(event_id).await?.expect("event exists").organizer;

        let res = store
            .update(update_of(event_id, organizer.organizer_id, 1)?)
            .await;
        assert!(matches!(res, Err(AppError::CapacityBelowConfirmed(2))));
        let event = store.find_by_id(event_id).await?.expect("event exists");
        assert_eq!(event.capacity.get(), 3);
        assert_eq!(event.title, "Campus tech talk");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shrinking_races_with_registrations_safely() -> anyhow::Result<()> {
        let (store, event_id) = setup(10, false).await?;
        let organizer = store.find_by_id(event_id).await?.expect("event exists").organizer;

        let mut handles = Vec::new();
        for i in 0..10 {
            let user_id = user(&store, &format!("user{i}")).await?;
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let _ = store
                    .register(RegisterAttendee::new(event_id, user_id, Utc::now()))
                    .await;
            }));
        }
        let shrink = {
            let store = store.clone();
            let update = update_of(event_id, organizer.organizer_id, 4)?;
            tokio::spawn(async move { store.update(update).await })
        };
        for handle in handles {
            handle.await?;
        }
        let shrunk = shrink.await?.is_ok();

        let event = store.find_by_id(event_id).await?.expect("event exists");
        let confirmed = store.confirmed_count(event_id).await?;
        assert!(confirmed <= event.capacity.get() as usize);
        if shrunk {
            assert_eq!(event.capacity.get(), 4);
        }
        Ok(())
    }

    #[tokio::test]
    async fn only_organizer_can_delete() -> anyhow::Result<()> {
        let (store, event_id) = setup(1, false).await?;
        let stranger = user(&store, "stranger").await?;

        let res = store.delete(DeleteEvent::new(event_id, stranger)).await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        let organizer = store.find_by_id(event_id).await?.expect("event exists").organizer;
        store
            .delete(DeleteEvent::new(event_id, organizer.organizer_id))
            .await?;
        assert!(store.find_by_id(event_id).await?.is_none());
        Ok(())
    }
}
