use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::domain::core::{Reservation, ReservationFilter, ReservationStore, StayPeriod};
use crate::domain::DataAccessError;

/// メモリ上の予約ストア（テスト・開発用）
///
/// 登録順を保持する。クローンは同じ領域を共有する。
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    entities: Arc<RwLock<Vec<Reservation>>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn find(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, DataAccessError> {
        let entities = self.entities.read().await;
        let found = entities
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect::<Vec<_>>();
        trace!("find {:?}: {}件", filter, found.len());
        Ok(found)
    }

    async fn insert(&self, entity: &Reservation) -> Result<(), DataAccessError> {
        self.entities.write().await.push(entity.clone());
        Ok(())
    }

    async fn update_one(
        &self,
        filter: &ReservationFilter,
        period: &StayPeriod,
    ) -> Result<bool, DataAccessError> {
        let mut entities = self.entities.write().await;
        match entities.iter_mut().find(|e| filter.matches(e)) {
            Some(entity) => {
                entity.change_period(*period);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_one(&self, filter: &ReservationFilter) -> Result<bool, DataAccessError> {
        let mut entities = self.entities.write().await;
        match entities.iter().position(|e| filter.matches(e)) {
            Some(index) => {
                entities.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
