//! The `catalog` module is the thin domain layer around the messaging core:
//! movie DTOs, the gateway-side messaging service (producers) and the
//! service-side messaging entrypoint (consumers) that applies movie commands
//! to a [`MovieStore`].

pub mod dtos;
pub mod entrypoint;
pub mod service;
pub mod store;

pub use dtos::{CreateMovieDto, IdPayload, MovieId};
pub use entrypoint::MessagingEntrypoint;
pub use service::{CatalogError, MovieMessagingService};
pub use store::{InMemoryStore, MovieStore};

/// Queue carrying movie creation commands.
pub const MOVIE_CREATE_QUEUE: &str = "movie-create";
/// Queue carrying movie deletion commands.
pub const MOVIE_DELETE_QUEUE: &str = "movie-delete";
