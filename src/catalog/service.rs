use thiserror::Error;

use crate::catalog::dtos::{CreateMovieDto, IdPayload, MovieId};
use crate::catalog::{MOVIE_CREATE_QUEUE, MOVIE_DELETE_QUEUE};
use crate::messaging::{MessageContext, Producer, Session};
use crate::utils::error::MessagingError;

/// Write-path failures, annotated with the command that failed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed saving movie {title:?}: {source}")]
    SaveFailed {
        title: String,
        source: MessagingError,
    },
    #[error("failed deleting movie with id {id}: {source}")]
    DeleteFailed { id: MovieId, source: MessagingError },
}

/// Gateway-side write service: one bound producer per command queue.
///
/// Callers must treat a returned error as "not guaranteed delivered";
/// nothing is buffered or retried here.
pub struct MovieMessagingService {
    save: Producer,
    delete: Producer,
}

impl MovieMessagingService {
    /// Declares both command queues on the session with the standard
    /// profiles and binds their producers.
    pub fn new(session: &Session) -> Result<Self, MessagingError> {
        let (_, save) = session.create_producer(MOVIE_CREATE_QUEUE, None, None)?;
        let (_, delete) = session.create_producer(MOVIE_DELETE_QUEUE, None, None)?;
        Ok(Self { save, delete })
    }

    pub fn save(&self, ctx: &MessageContext, movie: &CreateMovieDto) -> Result<(), CatalogError> {
        self.save
            .send(ctx, movie)
            .map_err(|source| CatalogError::SaveFailed {
                title: movie.title.clone(),
                source,
            })
    }

    pub fn delete(&self, ctx: &MessageContext, id: MovieId) -> Result<(), CatalogError> {
        self.delete
            .send(ctx, &IdPayload { id })
            .map_err(|source| CatalogError::DeleteFailed { id, source })
    }
}
