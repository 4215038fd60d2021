use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::pipeline::{OutboundRequest, Transport};

use super::models::{MessageResponse, Reservation, ReservationStatus};
use super::{seg, LibraryClient};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Whole days until `return_by`, rounded up. Negative once overdue.
pub fn days_left(return_by: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (return_by - now).num_milliseconds();
    if ms >= 0 {
        (ms + DAY_MS - 1) / DAY_MS
    } else {
        -(-ms / DAY_MS)
    }
}

impl<T: Transport> LibraryClient<T> {
    fn current_subject(&self) -> AppResult<String> {
        self.store
            .get()?
            .and_then(|s| s.subject_id().map(|id| id.to_string()))
            .ok_or_else(|| AppError::user("no_session", "No token found"))
    }

    /// Reserve `book_id` for the logged-in user.
    pub async fn reserve(&self, book_id: &str) -> AppResult<String> {
        let user_id = self.current_subject()?;
        let req = OutboundRequest::post("/reservations/create").with_json(&json!({"userId": user_id, "bookId": book_id}))?;
        let resp: MessageResponse = self.pipeline.json(req).await?;
        Ok(resp.message.unwrap_or_else(|| "Book reserved successfully".to_string()))
    }

    /// Active reservations of the logged-in user.
    pub async fn my_reservations(&self) -> AppResult<Vec<Reservation>> {
        let all: Vec<Reservation> = self.pipeline.json(OutboundRequest::get("/reservations")).await?;
        Ok(all.into_iter().filter(|r| r.status == ReservationStatus::Reserved).collect())
    }

    pub async fn cancel_reservation(&self, reservation_id: &str) -> AppResult<()> {
        self.pipeline.execute(OutboundRequest::delete(format!("/reservations/{}", seg(reservation_id)))).await?;
        Ok(())
    }

    /// Returned reservations of the logged-in user.
    pub async fn reservation_history(&self) -> AppResult<Vec<Reservation>> {
        let me = self.current_subject()?;
        let all = self.user_reservations(&me).await?;
        Ok(all.into_iter().filter(|r| r.status == ReservationStatus::Returned).collect())
    }

    /// Every reservation of `user_id`, active ones first.
    pub async fn user_reservations(&self, user_id: &str) -> AppResult<Vec<Reservation>> {
        let mut all: Vec<Reservation> =
            self.pipeline.json(OutboundRequest::get(format!("/reservations/user/{}", seg(user_id)))).await?;
        all.sort_by_key(|r| r.status != ReservationStatus::Reserved);
        Ok(all)
    }

    pub async fn send_return_alert(&self, reservation_id: &str) -> AppResult<String> {
        let req = OutboundRequest::post(format!("/reservations/{}/alert", seg(reservation_id)));
        let resp: MessageResponse = self.pipeline.json(req).await?;
        Ok(resp.message.unwrap_or_else(|| "Alert sent".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client;
    use crate::identity::encode_unsigned;
    use crate::pipeline::{ApiResponse, FnTransport};
    use chrono::{Duration, TimeZone};
    use reqwest::Method;

    fn backend(r: &OutboundRequest) -> AppResult<ApiResponse> {
        let rows = json!([
            {"_id": "r1", "status": "returned", "bookTitle": "Old"},
            {"_id": "r2", "status": "reserved", "bookTitle": "New", "returnByDate": "2024-05-01T10:00:00.000Z"},
            {"_id": "r3", "status": "returned", "bookTitle": "Older"}
        ]);
        match (r.method.as_str(), r.path.as_str()) {
            ("GET", "/reservations") | ("GET", "/reservations/user/u1") => Ok(ApiResponse::new(200, rows)),
            ("POST", "/reservations/create") => Ok(ApiResponse::new(201, json!({"message": "Reserved"}))),
            ("POST", "/reservations/r2/alert") => Ok(ApiResponse::new(200, json!({"message": "Alert sent to user"}))),
            ("DELETE", "/reservations/r2") => Ok(ApiResponse::new(200, json!(null))),
            _ => Ok(ApiResponse::new(404, json!({"message": "not found"}))),
        }
    }

    fn logged_in(t: FnTransport) -> LibraryClient<FnTransport> {
        let c = client(t);
        c.store().set(&encode_unsigned(&json!({"user": {"id": "u1", "role": "user"}}))).unwrap();
        c
    }

    #[test]
    fn days_left_rounds_up() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(days_left(now + Duration::hours(1), now), 1);
        assert_eq!(days_left(now + Duration::days(3), now), 3);
        assert_eq!(days_left(now, now), 0);
        assert_eq!(days_left(now - Duration::hours(36), now), -1);
        assert_eq!(days_left(now - Duration::days(2), now), -2);
    }

    #[tokio::test]
    async fn reserve_uses_subject_from_token() {
        let t = FnTransport::new(backend);
        let c = logged_in(t.clone());
        assert_eq!(c.reserve("b9").await.unwrap(), "Reserved");
        assert_eq!(t.seen()[0].body.as_ref().unwrap(), &json!({"userId": "u1", "bookId": "b9"}));
    }

    #[tokio::test]
    async fn reserve_without_session_sends_nothing() {
        let t = FnTransport::new(backend);
        let c = client(t.clone());
        assert_eq!(c.reserve("b9").await.unwrap_err().code_str(), "no_session");
        assert!(t.seen().is_empty());
    }

    #[tokio::test]
    async fn listings_filter_and_order() {
        let t = FnTransport::new(backend);
        let c = logged_in(t.clone());
        let active = c.my_reservations().await.unwrap();
        assert_eq!(active.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r2"]);
        let history = c.reservation_history().await.unwrap();
        assert_eq!(history.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r1", "r3"]);
        let all = c.user_reservations("u1").await.unwrap();
        assert_eq!(all.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r2", "r1", "r3"]);
    }

    #[tokio::test]
    async fn cancel_and_alert() {
        let t = FnTransport::new(backend);
        let c = logged_in(t.clone());
        c.cancel_reservation("r2").await.unwrap();
        assert_eq!(t.seen()[0].method, Method::DELETE);
        assert_eq!(c.send_return_alert("r2").await.unwrap(), "Alert sent to user");
        assert_eq!(c.cancel_reservation("zz").await.unwrap_err().http_status(), Some(404));
    }
}
