pub mod auth;
pub mod event;
pub mod health;
pub mod roster;
pub mod rsvp;
pub mod user;
