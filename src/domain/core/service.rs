use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Reservation, ReservationError, ReservationFilter, ReservationStore, RoomId, StayPeriod};

/// 予約サービス
///
/// 入力を検証し、同じ部屋の既存予約との重複を確認してからストアを更新する。
/// 確認と更新の間に排他制御はないため、同時に届いた予約が両方成立することがある。
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
}

impl ReservationService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// 宿泊者名で予約を検索する
    pub async fn find_by_guest(&self, name: &str) -> Result<Vec<Reservation>, ReservationError> {
        Ok(self.store.find(&ReservationFilter::by_name(name)).await?)
    }

    /// 部屋番号で予約を検索する（部屋番号の範囲は検証しない）
    pub async fn find_by_room(&self, room_id: RoomId) -> Result<Vec<Reservation>, ReservationError> {
        Ok(self.store.find(&ReservationFilter::by_room(room_id)).await?)
    }

    /// 部屋が期間中に空いているか
    pub async fn is_room_available(
        &self,
        room_id: RoomId,
        period: &StayPeriod,
    ) -> Result<bool, ReservationError> {
        let existing = self.store.find(&ReservationFilter::by_room(room_id)).await?;
        let conflict = existing.iter().find(|r| r.period().overlaps(period));
        if let Some(r) = conflict {
            debug!(
                "部屋{}の予約が重複: {} {}..={}",
                room_id,
                r.name(),
                r.start_date(),
                r.end_date()
            );
        }
        Ok(conflict.is_none())
    }

    /// 予約を登録する
    pub async fn reserve(&self, entity: Reservation) -> Result<Reservation, ReservationError> {
        if !entity.room_id().is_bookable() {
            warn!("予約できない部屋番号: {}", entity.room_id());
            return Err(ReservationError::InvalidRoom(entity.room_id()));
        }
        if !entity.period().is_ordered() {
            return Err(ReservationError::InvalidDateRange);
        }
        if !self
            .is_room_available(entity.room_id(), &entity.period())
            .await?
        {
            return Err(ReservationError::Overlap);
        }
        self.store.insert(&entity).await?;
        info!(
            "予約を登録: {} 部屋{} {}..={}",
            entity.name(),
            entity.room_id(),
            entity.start_date(),
            entity.end_date()
        );
        Ok(entity)
    }

    /// 予約の期間を変更する
    ///
    /// 変更対象の予約自身も重複確認の対象に含まれる。一致する予約がなくても成功とする。
    pub async fn update(
        &self,
        identity: &Reservation,
        period: StayPeriod,
    ) -> Result<(), ReservationError> {
        if !identity.period().is_ordered() || !period.is_ordered() {
            return Err(ReservationError::InvalidDateRange);
        }
        if !self.is_room_available(identity.room_id(), &period).await? {
            return Err(ReservationError::Overlap);
        }
        let matched = self
            .store
            .update_one(&ReservationFilter::identity(identity), &period)
            .await?;
        if matched {
            info!(
                "予約を変更: {} 部屋{} {}..={}",
                identity.name(),
                identity.room_id(),
                period.start_date(),
                period.end_date()
            );
        } else {
            debug!("変更対象の予約なし: {:?}", identity);
        }
        Ok(())
    }

    /// 予約を取り消す（一致する予約がなくても成功とする）
    pub async fn cancel(&self, identity: &Reservation) -> Result<(), ReservationError> {
        if !identity.period().is_ordered() {
            return Err(ReservationError::InvalidDateRange);
        }
        let matched = self
            .store
            .delete_one(&ReservationFilter::identity(identity))
            .await?;
        if matched {
            info!("予約を取消: {} 部屋{}", identity.name(), identity.room_id());
        } else {
            debug!("取消対象の予約なし: {:?}", identity);
        }
        Ok(())
    }
}
