use std::time::Duration;

use async_trait::async_trait;
use meilisearch_sdk::{
    indexes::Index, settings::PaginationSetting, task_info::TaskInfo, tasks::Task, Client,
};
use serde::{Deserialize, Serialize};
use snowflake::SnowflakeIdGenerator;
use tracing::{debug, info};

use crate::domain::core::{Reservation, ReservationFilter, ReservationStore, StayPeriod};
use crate::domain::{DataAccessError, IdGeneratorTask};
use crate::MeiliSearch;

const PRIMARY_KEY: &str = "id";
const FILTERABLE_ATTRIBUTES: [&str; 4] = ["name", "room_id", "start_date", "end_date"];

/// Meilisearchのドキュメント
///
/// 主キーはストア内部でのみ使い、予約エンティティには含めない。
#[derive(Debug, Serialize, Deserialize)]
struct MeiliReservation {
    id: u64,
    #[serde(flatten)]
    entity: Reservation,
}

/// Meilisearchのインデックスをドキュメントストアとして使う予約ストア
///
/// Meilisearchの文字列比較は大文字小文字を区別しないため、検索結果は
/// `ReservationFilter::matches` で絞り込んでから使う。
#[derive(Clone)]
pub struct MeiliSearchReservationStore {
    client: Client,
    index: Index,
    ids: IdGeneratorTask,
    max_hits: usize,
    task_timeout: Duration,
}

impl MeiliSearchReservationStore {
    /// インデックスの検索条件と検索上限を設定して接続する
    pub async fn connect(config: &MeiliSearch) -> Result<Self, DataAccessError> {
        let client = Client::new(&config.url, &config.api_key);
        let index = client.index(&config.index);
        let store = Self {
            client,
            index,
            ids: IdGeneratorTask::spawn(
                SnowflakeIdGenerator::new(config.machine_id, config.node_id).into(),
            ),
            max_hits: config.max_hits,
            task_timeout: Duration::from_secs(config.task_timeout),
        };
        let task = store
            .index
            .set_filterable_attributes(FILTERABLE_ATTRIBUTES)
            .await?;
        store.wait_for_completion(&task).await?;
        // 上限を1件超えて取得できるようにし、取りこぼしを検出する
        let task = store
            .index
            .set_pagination(PaginationSetting {
                max_total_hits: store.max_hits + 1,
            })
            .await?;
        store.wait_for_completion(&task).await?;
        info!("Meilisearchに接続: {} ({})", config.url, config.index);
        Ok(store)
    }

    async fn wait_for_completion(&self, task_info: &TaskInfo) -> Result<(), DataAccessError> {
        match self
            .client
            .wait_for_task(task_info, None, Some(self.task_timeout))
            .await?
        {
            Task::Succeeded { .. } => Ok(()),
            task @ Task::Failed { .. } => Err(DataAccessError::WriteError(
                format!("Meilisearch task failed: {:?}", task).into(),
            )),
            task => Err(DataAccessError::ConnectionError(
                format!("Meilisearch task did not finish: {:?}", task).into(),
            )),
        }
    }

    async fn find_documents(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<MeiliReservation>, DataAccessError> {
        let expression = filter_expression(filter);
        let mut query = self.index.search();
        query.with_limit(self.max_hits + 1);
        if let Some(expression) = expression.as_deref() {
            query.with_filter(expression);
        }
        let results = query.execute::<MeiliReservation>().await?;
        debug!("search {:?}: {}件", expression, results.hits.len());
        let documents = results.hits.into_iter().map(|hit| hit.result).collect();
        Ok(exact_matches(filter, within_limit(documents, self.max_hits)?))
    }
}

#[async_trait]
impl ReservationStore for MeiliSearchReservationStore {
    async fn find(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, DataAccessError> {
        Ok(self
            .find_documents(filter)
            .await?
            .into_iter()
            .map(|document| document.entity)
            .collect())
    }

    async fn insert(&self, entity: &Reservation) -> Result<(), DataAccessError> {
        let document = MeiliReservation {
            id: self.ids.generate().await?,
            entity: entity.clone(),
        };
        let task = self
            .index
            .add_documents(&[document], Some(PRIMARY_KEY))
            .await?;
        self.wait_for_completion(&task).await
    }

    async fn update_one(
        &self,
        filter: &ReservationFilter,
        period: &StayPeriod,
    ) -> Result<bool, DataAccessError> {
        let Some(mut document) = self.find_documents(filter).await?.into_iter().next() else {
            return Ok(false);
        };
        document.entity.change_period(*period);
        let task = self
            .index
            .add_or_update(&[document], Some(PRIMARY_KEY))
            .await?;
        self.wait_for_completion(&task).await?;
        Ok(true)
    }

    async fn delete_one(&self, filter: &ReservationFilter) -> Result<bool, DataAccessError> {
        let Some(document) = self.find_documents(filter).await?.into_iter().next() else {
            return Ok(false);
        };
        let task = self.index.delete_document(document.id).await?;
        self.wait_for_completion(&task).await?;
        Ok(true)
    }
}

/// 検索上限を超えた結果は一部が欠けているため読み込みエラーにする
fn within_limit(
    documents: Vec<MeiliReservation>,
    max_hits: usize,
) -> Result<Vec<MeiliReservation>, DataAccessError> {
    match documents.len() > max_hits {
        true => Err(DataAccessError::ReadError(
            format!("more than {} reservations match the filter", max_hits).into(),
        )),
        false => Ok(documents),
    }
}

/// 検索結果から条件に完全一致するドキュメントだけを残す
fn exact_matches(
    filter: &ReservationFilter,
    documents: Vec<MeiliReservation>,
) -> Vec<MeiliReservation> {
    documents
        .into_iter()
        .filter(|document| filter.matches(&document.entity))
        .collect()
}

/// 検索条件をMeilisearchのフィルタ式に変換する（条件なしは `None`）
fn filter_expression(filter: &ReservationFilter) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(name) = &filter.name {
        clauses.push(format!("name = {}", quote(name)));
    }
    if let Some(room_id) = filter.room_id {
        clauses.push(format!("room_id = {}", room_id));
    }
    if let Some(date) = filter.start_date {
        clauses.push(format!("start_date = {}", quote(&date.to_string())));
    }
    if let Some(date) = filter.end_date {
        clauses.push(format!("end_date = {}", quote(&date.to_string())));
    }
    match clauses.is_empty() {
        true => None,
        false => Some(clauses.join(" AND ")),
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn reservation(name: &str, start: &str, end: &str, room: i64) -> Reservation {
        let start: NaiveDate = start.parse().unwrap();
        let end: NaiveDate = end.parse().unwrap();
        Reservation::new(name, StayPeriod::new(start, end), room.into())
    }

    #[test]
    fn test_filter_expression_empty() {
        assert_eq!(filter_expression(&ReservationFilter::default()), None);
    }

    #[test]
    fn test_filter_expression_room() {
        assert_eq!(
            filter_expression(&ReservationFilter::by_room(3.into())).as_deref(),
            Some("room_id = 3")
        );
    }

    #[test]
    fn test_filter_expression_identity() {
        let entity = reservation("Ana", "2024-03-01", "2024-03-05", 2);
        assert_eq!(
            filter_expression(&ReservationFilter::identity(&entity)).as_deref(),
            Some(
                r#"name = "Ana" AND room_id = 2 AND start_date = "2024-03-01" AND end_date = "2024-03-05""#
            )
        );
    }

    #[test]
    fn test_filter_expression_escapes_name() {
        assert_eq!(
            filter_expression(&ReservationFilter::by_name(r#"O"Neil\"#)).as_deref(),
            Some(r#"name = "O\"Neil\\""#)
        );
    }

    fn document(id: u64, entity: Reservation) -> MeiliReservation {
        MeiliReservation { id, entity }
    }

    #[test]
    fn test_exact_matches_drops_case_folded_hits() {
        let identity = reservation("ana", "2024-03-01", "2024-03-05", 2);
        // Meilisearchは "ana" の検索で "Ana" も返す
        let hits = vec![
            document(1, reservation("Ana", "2024-03-01", "2024-03-05", 2)),
            document(2, identity.clone()),
            document(3, reservation("ANA", "2024-03-01", "2024-03-05", 2)),
        ];
        let matched = exact_matches(&ReservationFilter::identity(&identity), hits);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, 2);
        assert_eq!(matched[0].entity, identity);
    }

    #[test]
    fn test_exact_matches_without_exact_hit() {
        let hits = vec![document(
            1,
            reservation("Ana", "2024-03-01", "2024-03-05", 2),
        )];
        assert!(exact_matches(&ReservationFilter::by_name("ana"), hits).is_empty());
    }

    #[test]
    fn test_exact_matches_keeps_order() {
        let hits = vec![
            document(5, reservation("Ana", "2024-03-01", "2024-03-05", 2)),
            document(3, reservation("Bo", "2024-04-01", "2024-04-05", 2)),
            document(9, reservation("Ana", "2024-05-01", "2024-05-05", 2)),
        ];
        let ids = exact_matches(&ReservationFilter::by_name("Ana"), hits)
            .into_iter()
            .map(|d| d.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![5, 9]);
    }

    #[test]
    fn test_within_limit() {
        let hits = (0..3)
            .map(|id| document(id, reservation("Ana", "2024-03-01", "2024-03-05", 2)))
            .collect::<Vec<_>>();
        assert_eq!(within_limit(hits, 3).unwrap().len(), 3);

        let hits = (0..4)
            .map(|id| document(id, reservation("Ana", "2024-03-01", "2024-03-05", 2)))
            .collect::<Vec<_>>();
        assert!(matches!(
            within_limit(hits, 3),
            Err(DataAccessError::ReadError(_))
        ));
    }

    #[test]
    fn test_document_shape() {
        let document = MeiliReservation {
            id: 42,
            entity: reservation("Ana", "2024-03-01", "2024-03-05", 2),
        };
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({
                "id": 42,
                "name": "Ana",
                "start_date": "2024-03-01",
                "end_date": "2024-03-05",
                "room_id": 2,
            })
        );
    }

    #[tokio::test]
    #[ignore = "requires a Meilisearch server on localhost:7700"]
    async fn test_repository() {
        let config = MeiliSearch {
            url: "http://localhost:7700".to_owned(),
            api_key: "masterKey".to_owned(),
            index: format!("reservation_test_{}", std::process::id()),
            machine_id: 1,
            node_id: 1,
            max_hits: 1000,
            task_timeout: 30,
        };
        let store = MeiliSearchReservationStore::connect(&config).await.unwrap();
        let entity = reservation("Ana", "2024-03-01", "2024-03-05", 2);

        // 登録確認
        store.insert(&entity).await.unwrap();
        assert!(store
            .find(&ReservationFilter::by_name("ana"))
            .await
            .unwrap()
            .is_empty());
        assert!(!store
            .delete_one(&ReservationFilter::identity(&reservation(
                "ana",
                "2024-03-01",
                "2024-03-05",
                2
            )))
            .await
            .unwrap());
        assert_eq!(
            store.find(&ReservationFilter::by_name("Ana")).await.unwrap(),
            vec![entity.clone()]
        );

        // 変更確認
        let period = StayPeriod::new(
            "2024-04-01".parse().unwrap(),
            "2024-04-02".parse().unwrap(),
        );
        assert!(store
            .update_one(&ReservationFilter::identity(&entity), &period)
            .await
            .unwrap());
        let moved = store.find(&ReservationFilter::by_room(2.into())).await.unwrap();
        assert_eq!(moved[0].period(), period);

        // 削除確認
        assert!(store
            .delete_one(&ReservationFilter::identity(&moved[0]))
            .await
            .unwrap());
        assert!(!store
            .delete_one(&ReservationFilter::identity(&moved[0]))
            .await
            .unwrap());
        assert!(store.find(&ReservationFilter::default()).await.unwrap().is_empty());
    }
}
