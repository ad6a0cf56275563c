use std::collections::HashMap;
use std::sync::Mutex;

use crate::catalog::dtos::{CreateMovieDto, MovieId};
use crate::messaging::HandlerError;

/// Write-side persistence port for the catalog. The production system backs
/// this with an external table store; tests and the embedded binary use
/// [`InMemoryStore`].
pub trait MovieStore: Send + Sync {
    fn save(&self, movie: CreateMovieDto) -> Result<MovieId, HandlerError>;
    fn delete(&self, id: MovieId) -> Result<bool, HandlerError>;
}

#[derive(Default)]
struct Inner {
    next_id: MovieId,
    movies: HashMap<MovieId, CreateMovieDto>,
}

/// In-memory movie store with sequential id assignment.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MovieId) -> Option<CreateMovieDto> {
        self.inner.lock().unwrap().movies.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MovieStore for InMemoryStore {
    fn save(&self, movie: CreateMovieDto) -> Result<MovieId, HandlerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.movies.insert(id, movie);
        Ok(id)
    }

    fn delete(&self, id: MovieId) -> Result<bool, HandlerError> {
        Ok(self.inner.lock().unwrap().movies.remove(&id).is_some())
    }
}
