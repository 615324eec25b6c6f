pub mod attendee;
pub mod envelope;
pub mod event;
