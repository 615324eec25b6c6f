pub mod attendee;
pub mod auth;
pub mod event;
pub mod id;
pub mod role;
pub mod user;
