pub mod core;

use meilisearch_sdk::errors::Error;

use crate::domain::DataAccessError;

impl From<Error> for DataAccessError {
    fn from(value: Error) -> Self {
        match value {
            Error::UnreachableServer | Error::Timeout => Self::ConnectionError(Box::new(value)),
            Error::Meilisearch(_) => Self::QueryError(Box::new(value)),
            Error::ParseError(_) => Self::ReadError(Box::new(value)),
            _ => Self::ClientSideError(Box::new(value)),
        }
    }
}
