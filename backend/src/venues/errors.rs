use engine::{IndexError, Venue};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VenueError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{venue} api error {code}: {message}")]
    Api {
        venue: Venue,
        code: i64,
        message: String,
    },

    #[error("invalid response from {venue}: {reason}")]
    InvalidResponse { venue: Venue, reason: String },

    #[error("{venue} returned no {what}")]
    Empty { venue: Venue, what: &'static str },

    #[error("{venue} signal rejected: {source}")]
    Signal {
        venue: Venue,
        #[source]
        source: IndexError,
    },

    #[error("{venue} fetch task aborted: {reason}")]
    Aborted { venue: Venue, reason: String },
}

impl VenueError {
    pub fn invalid(venue: Venue, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            venue,
            reason: reason.into(),
        }
    }
}
