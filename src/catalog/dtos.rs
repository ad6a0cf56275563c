use serde::{Deserialize, Serialize};

pub type MovieId = u64;

/// Creation command payload. `year` stays a string end to end; it is opaque
/// catalog data, not a number we do arithmetic on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMovieDto {
    pub title: String,
    pub year: String,
}

/// Deletion command payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPayload {
    pub id: MovieId,
}
