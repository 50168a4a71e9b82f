use std::ops::RangeInclusive;

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::DataAccessError;

/// 予約ストア
///
/// 各フィールドの完全一致でのみ検索・更新・削除を行う。
/// 重複チェックと登録は別々の呼び出しであり、アトミックではない。
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// 条件に一致する予約をすべて取得する
    async fn find(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, DataAccessError>;
    /// 予約を登録する
    async fn insert(&self, entity: &Reservation) -> Result<(), DataAccessError>;
    /// 条件に一致する最初の予約の宿泊期間を書き換える
    async fn update_one(
        &self,
        filter: &ReservationFilter,
        period: &StayPeriod,
    ) -> Result<bool, DataAccessError>;
    /// 条件に一致する最初の予約を削除する
    async fn delete_one(&self, filter: &ReservationFilter) -> Result<bool, DataAccessError>;
}

/// 予約可能な部屋番号
pub const BOOKABLE_ROOMS: RangeInclusive<i64> = 1..=10;

/// 部屋番号
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Deref, Default,
)]
pub struct RoomId(i64);

impl RoomId {
    pub fn is_bookable(&self) -> bool {
        BOOKABLE_ROOMS.contains(&self.0)
    }
}

/// 宿泊期間（開始日・終了日ともに含む）
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayPeriod {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl StayPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// 開始日が終了日以前か
    pub fn is_ordered(&self) -> bool {
        self.start_date <= self.end_date
    }

    /// 既存の期間 `self` と候補の期間が1日でも重なるか
    ///
    /// 境界日は重複として扱う（同日のチェックアウトとチェックインは不可）。
    pub fn overlaps(&self, candidate: &StayPeriod) -> bool {
        let (s1, e1) = (self.start_date, self.end_date);
        let (s2, e2) = (candidate.start_date, candidate.end_date);
        (s1 <= s2 && e1 >= s2) || (s1 <= e2 && e1 >= e2) || (s2 <= s1 && e2 >= e1)
    }
}

/// 予約エンティティ
///
/// 名前・期間・部屋番号の組で特定される。ストア側のIDは公開しない。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    room_id: RoomId,
}

impl Reservation {
    pub fn new(name: impl Into<String>, period: StayPeriod, room_id: RoomId) -> Self {
        Self {
            name: name.into(),
            start_date: period.start_date,
            end_date: period.end_date,
            room_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn period(&self) -> StayPeriod {
        StayPeriod::new(self.start_date, self.end_date)
    }

    pub fn change_period(&mut self, period: StayPeriod) {
        self.start_date = period.start_date;
        self.end_date = period.end_date;
    }
}

/// 予約の検索条件（指定したフィールドすべての完全一致）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub name: Option<String>,
    pub room_id: Option<RoomId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReservationFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn by_room(room_id: RoomId) -> Self {
        Self {
            room_id: Some(room_id),
            ..Default::default()
        }
    }

    /// 予約を特定する4項目すべてを条件にする
    pub fn identity(entity: &Reservation) -> Self {
        Self {
            name: Some(entity.name.clone()),
            room_id: Some(entity.room_id),
            start_date: Some(entity.start_date),
            end_date: Some(entity.end_date),
        }
    }

    pub fn matches(&self, entity: &Reservation) -> bool {
        self.name.as_deref().map_or(true, |n| n == entity.name)
            && self.room_id.map_or(true, |r| r == entity.room_id)
            && self.start_date.map_or(true, |d| d == entity.start_date)
            && self.end_date.map_or(true, |d| d == entity.end_date)
    }
}

/// 予約エラー
#[derive(Error, Display, Debug)]
pub enum ReservationError {
    /// 予約できない部屋番号です
    #[display(fmt = "Room {} is not bookable", _0)]
    InvalidRoom(#[error(not(source))] RoomId),
    /// 開始日が終了日より後です
    #[display(fmt = "Start date is after end date")]
    InvalidDateRange,
    /// 既存の予約と期間が重なっています
    #[display(fmt = "Room is already reserved for the period")]
    Overlap,
    /// ストアにアクセスできません
    #[display(fmt = "Reservation store unavailable: {}", _0)]
    StoreUnavailable(#[error(source)] DataAccessError),
}

impl From<DataAccessError> for ReservationError {
    fn from(value: DataAccessError) -> Self {
        ReservationError::StoreUnavailable(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn period(start: &str, end: &str) -> StayPeriod {
        StayPeriod::new(date(start), date(end))
    }

    #[test]
    fn test_room_bounds() {
        assert!(!RoomId::from(0).is_bookable());
        assert!(RoomId::from(1).is_bookable());
        assert!(RoomId::from(10).is_bookable());
        assert!(!RoomId::from(11).is_bookable());
        assert!(!RoomId::from(-3).is_bookable());
    }

    #[test]
    fn test_period_ordering() {
        assert!(period("2024-03-01", "2024-03-05").is_ordered());
        assert!(period("2024-03-01", "2024-03-01").is_ordered());
        assert!(!period("2024-03-05", "2024-03-01").is_ordered());
    }

    #[test]
    fn test_overlaps_shared_boundary() {
        let existing = period("2024-01-10", "2024-01-15");
        assert!(existing.overlaps(&period("2024-01-15", "2024-01-20")));
        assert!(existing.overlaps(&period("2024-01-05", "2024-01-10")));
        assert!(!existing.overlaps(&period("2024-01-16", "2024-01-20")));
        assert!(!existing.overlaps(&period("2024-01-01", "2024-01-09")));
    }

    #[test]
    fn test_overlaps_containment() {
        let existing = period("2024-01-10", "2024-01-15");
        // 候補が既存を包含
        assert!(existing.overlaps(&period("2024-01-01", "2024-01-31")));
        // 既存が候補を包含
        assert!(existing.overlaps(&period("2024-01-12", "2024-01-13")));
        assert!(existing.overlaps(&existing));
    }

    #[test]
    fn test_filter_matches() {
        let entity = Reservation::new("Ana", period("2024-03-01", "2024-03-05"), 2.into());
        assert!(ReservationFilter::default().matches(&entity));
        assert!(ReservationFilter::by_name("Ana").matches(&entity));
        assert!(!ReservationFilter::by_name("ana").matches(&entity));
        assert!(ReservationFilter::by_room(2.into()).matches(&entity));
        assert!(!ReservationFilter::by_room(3.into()).matches(&entity));
        assert!(ReservationFilter::identity(&entity).matches(&entity));

        let mut moved = entity.clone();
        moved.change_period(period("2024-03-02", "2024-03-05"));
        assert!(!ReservationFilter::identity(&entity).matches(&moved));
    }

    #[test]
    fn test_reservation_json_shape() {
        let entity = Reservation::new("Ana", period("2024-03-01", "2024-03-05"), 2.into());
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Ana",
                "start_date": "2024-03-01",
                "end_date": "2024-03-05",
                "room_id": 2,
            })
        );
        assert_eq!(
            serde_json::from_value::<Reservation>(value).unwrap(),
            entity
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ReservationError::InvalidRoom(11.into()).to_string(),
            "Room 11 is not bookable"
        );
        assert_eq!(
            ReservationError::Overlap.to_string(),
            "Room is already reserved for the period"
        );
    }
}
