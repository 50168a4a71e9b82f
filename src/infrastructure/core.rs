mod in_memory;
mod meilisearch;

use std::sync::Arc;

use crate::domain::core::ReservationStore;
use crate::domain::DataAccessError;
use crate::{Backend, Store};

pub use self::in_memory::*;
pub use self::meilisearch::*;

/// 設定に応じたストアを生成する
pub async fn connect(config: &Store) -> Result<Arc<dyn ReservationStore>, DataAccessError> {
    match (config.backend, &config.meilisearch) {
        (Backend::InMemory, _) => Ok(Arc::new(InMemoryReservationStore::new())),
        (Backend::MeiliSearch, Some(meilisearch)) => {
            Ok(Arc::new(MeiliSearchReservationStore::connect(meilisearch).await?))
        }
        (Backend::MeiliSearch, None) => Err(DataAccessError::ClientSideError(
            "store.meilisearch is not configured".into(),
        )),
    }
}
