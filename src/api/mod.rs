//! Typed calls for every backend endpoint the client uses. Everything goes through the
//! authenticated pipeline; nothing here looks at credentials except `login`/`logout`.

mod auth;
mod books;
mod models;
mod reservations;
mod users;

use crate::config::ClientConfig;
use crate::error::AppResult;
use crate::identity::SessionStore;
use crate::pipeline::{HttpTransport, Pipeline, SessionEvents, Transport};

pub use auth::{validate_email, validate_new_password};
pub use auth::MIN_PASSWORD_LEN;
pub use books::{page_count, DEFAULT_PAGE_SIZE};
pub use models::{
    Book, BookPage, LoginResponse, MessageResponse, NewBook, Reservation, ReservationStatus, UserOverview, UserRecord,
};
pub use reservations::days_left;

pub struct LibraryClient<T: Transport> {
    pipeline: Pipeline<T>,
    store: SessionStore,
    events: SessionEvents,
}

impl LibraryClient<HttpTransport> {
    pub fn connect(cfg: &ClientConfig, store: SessionStore, events: SessionEvents) -> AppResult<Self> {
        let transport = HttpTransport::new(cfg)?;
        let pipeline = Pipeline::with_session(transport, store.clone(), events.clone(), &cfg.token_header);
        Ok(Self::new(pipeline, store, events))
    }
}

impl<T: Transport> LibraryClient<T> {
    pub fn new(pipeline: Pipeline<T>, store: SessionStore, events: SessionEvents) -> Self {
        Self { pipeline, store, events }
    }

    pub fn pipeline(&self) -> &Pipeline<T> { &self.pipeline }

    pub fn store(&self) -> &SessionStore { &self.store }

    pub fn events(&self) -> &SessionEvents { &self.events }
}

fn seg(raw: &str) -> String { urlencoding::encode(raw).into_owned() }

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::pipeline::FnTransport;

    pub const HEADER: &str = "x-auth-token";

    pub fn client(t: FnTransport) -> LibraryClient<FnTransport> {
        let store = SessionStore::in_memory();
        let events = SessionEvents::default();
        let pipeline = Pipeline::with_session(t, store.clone(), events.clone(), HEADER);
        LibraryClient::new(pipeline, store, events)
    }
}
