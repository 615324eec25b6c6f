use axum::{
    routing::{delete, get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    event::{delete_event, register_event, show_event, show_event_list, update_event},
    rsvp::{cancel_rsvp, rsvp_event, show_attendees},
};

pub fn build_event_routers() -> Router<AppRegistry> {
    let events_routers = Router::new()
        .route("/", get(show_event_list))
        .route("/", post(register_event))
        .route("/:event_id", get(show_event))
        .route("/:event_id", put(update_event))
        .route("/:event_id", delete(delete_event))
        .route("/rsvp/:event_id", post(rsvp_event))
        .route("/rsvp/:event_id", delete(cancel_rsvp))
        .route("/attendees/:event_id", get(show_attendees));

    Router::new().nest("/event", events_routers)
}
