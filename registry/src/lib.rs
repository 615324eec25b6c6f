use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::memory::InMemoryStore;
use adapter::repository::{
    auth::AuthRepositoryImpl, event::EventRepositoryImpl, health::HealthCheckRepositoryImpl,
    roster::RosterRepositoryImpl, rsvp::RsvpRepositoryImpl, user::UserRepositoryImpl,
};
use kernel::repository::{
    auth::AuthRepository, event::EventRepository, health::HealthCheckRepository,
    roster::RosterRepository, rsvp::RsvpRepository, user::UserRepository,
};
use shared::config::RsvpConfig;

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    event_repository: Arc<dyn EventRepository>,
    rsvp_repository: Arc<dyn RsvpRepository>,
    roster_repository: Arc<dyn RosterRepository>,
    user_repository: Arc<dyn UserRepository>,
    auth_repository: Arc<dyn AuthRepository>,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, rsvp_config: RsvpConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let event_repository = Arc::new(EventRepositoryImpl::new(pool.clone(), rsvp_config));
        let rsvp_repository = Arc::new(RsvpRepositoryImpl::new(pool.clone(), rsvp_config));
        let roster_repository = Arc::new(RosterRepositoryImpl::new(pool.clone()));
        let user_repository = Arc::new(UserRepositoryImpl::new(pool.clone()));
        let auth_repository = Arc::new(AuthRepositoryImpl::new(pool.clone()));
        Self {
            health_check_repository,
            event_repository,
            rsvp_repository,
            roster_repository,
            user_repository,
            auth_repository,
        }
    }

    // すべてのリポジトリを同じインメモリストアで賄う
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            health_check_repository: store.clone(),
            event_repository: store.clone(),
            rsvp_repository: store.clone(),
            roster_repository: store.clone(),
            user_repository: store.clone(),
            auth_repository: store,
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn event_repository(&self) -> Arc<dyn EventRepository> {
        self.event_repository.clone()
    }

    pub fn rsvp_repository(&self) -> Arc<dyn RsvpRepository> {
        self.rsvp_repository.clone()
    }

    pub fn roster_repository(&self) -> Arc<dyn RosterRepository> {
        self.roster_repository.clone()
    }

    pub fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.user_repository.clone()
    }

    pub fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth_repository.clone()
    }
}
