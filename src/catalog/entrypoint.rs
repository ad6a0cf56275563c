use std::sync::Arc;

use tracing::info;

use crate::catalog::dtos::{CreateMovieDto, IdPayload};
use crate::catalog::store::MovieStore;
use crate::catalog::{MOVIE_CREATE_QUEUE, MOVIE_DELETE_QUEUE};
use crate::messaging::Session;
use crate::utils::error::MessagingError;

/// Service-side consumer wiring: decodes the loosely-typed command payloads
/// and applies them to the movie store.
///
/// Payloads arrive as generic JSON values because envelope decoding is
/// schema-agnostic; each handler applies its own schema for its queue.
pub struct MessagingEntrypoint {
    store: Arc<dyn MovieStore>,
}

impl MessagingEntrypoint {
    pub fn new(store: Arc<dyn MovieStore>) -> Self {
        Self { store }
    }

    /// Registers both command consumers on the session. Call
    /// [`Session::listen`] afterwards to start consumption.
    pub fn register(&self, session: &mut Session) -> Result<(), MessagingError> {
        let store = Arc::clone(&self.store);
        session.register_consumer(MOVIE_CREATE_QUEUE, None, None, move |_ctx, payload| {
            let store = Arc::clone(&store);
            async move {
                let movie: CreateMovieDto = serde_json::from_value(payload)?;
                let id = store.save(movie.clone())?;
                info!(id, title = %movie.title, year = %movie.year, "movie saved");
                Ok(())
            }
        })?;

        let store = Arc::clone(&self.store);
        session.register_consumer(MOVIE_DELETE_QUEUE, None, None, move |_ctx, payload| {
            let store = Arc::clone(&store);
            async move {
                let body: IdPayload = serde_json::from_value(payload)?;
                if !store.delete(body.id)? {
                    return Err(format!("no movie with id {}", body.id).into());
                }
                info!(id = body.id, "movie deleted");
                Ok(())
            }
        })?;

        Ok(())
    }
}
