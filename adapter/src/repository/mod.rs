pub mod auth;
pub mod event;
mod guard;
pub mod health;
pub mod roster;
pub mod rsvp;
pub mod user;
