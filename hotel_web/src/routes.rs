use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use hotel::domain::core::{Reservation, ReservationError, ReservationService, StayPeriod};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

pub fn router(service: ReservationService) -> Router {
    Router::new()
        .route("/reservation", post(reserve))
        .route("/reservation/by-name/:name", get(find_by_guest))
        .route("/reservation/by-room/:room_id", get(find_by_room))
        .route("/reservation/update", put(update))
        .route("/reservation/delete", delete(cancel))
        .with_state(service)
}

#[derive(Deserialize)]
struct UpdateRequest {
    reservation: Reservation,
    new_start_date: NaiveDate,
    new_end_date: NaiveDate,
}

struct ApiError(ReservationError);

impl From<ReservationError> for ApiError {
    fn from(value: ReservationError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            ReservationError::InvalidRoom(_) => {
                (StatusCode::BAD_REQUEST, "No reservations".to_owned())
            }
            ReservationError::InvalidDateRange => (StatusCode::BAD_REQUEST, "Date error".to_owned()),
            ReservationError::Overlap => (StatusCode::BAD_REQUEST, "Overlapped".to_owned()),
            ReservationError::StoreUnavailable(e) => {
                error!("ストアエラー: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

async fn find_by_guest(
    State(service): State<ReservationService>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = service.find_by_guest(&name).await?;
    Ok(Json(json!({ "result": result })))
}

async fn find_by_room(
    State(service): State<ReservationService>,
    Path(room_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let result = service.find_by_room(room_id.into()).await?;
    Ok(Json(json!({ "result": result })))
}

async fn reserve(
    State(service): State<ReservationService>,
    Json(reservation): Json<Reservation>,
) -> Result<Json<Value>, ApiError> {
    service.reserve(reservation).await?;
    Ok(Json(json!({ "msg": "reserve success" })))
}

async fn update(
    State(service): State<ReservationService>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let period = StayPeriod::new(request.new_start_date, request.new_end_date);
    service.update(&request.reservation, period).await?;
    Ok(Json(json!({ "msg": "update success" })))
}

async fn cancel(
    State(service): State<ReservationService>,
    Json(reservation): Json<Reservation>,
) -> Result<Json<Value>, ApiError> {
    service.cancel(&reservation).await?;
    Ok(Json(json!({ "msg": "delete success" })))
}
