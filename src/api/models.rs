//! Wire shapes of the library backend. Field names follow the backend's camelCase and
//! Mongo-style `_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "availableCopies", default)]
    pub available_copies: i64,
    #[serde(rename = "totalCopies", default)]
    pub total_copies: Option<i64>,
}

impl Book {
    pub fn is_available(&self) -> bool { self.available_copies > 0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookPage {
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(rename = "totalItems", default)]
    pub total_items: u64,
}

/// Form data for a new book. Every copy starts out available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub category: String,
    pub description: String,
    pub total_copies: u32,
}

impl Serialize for NewBook {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            title: &'a str,
            author: &'a str,
            category: &'a str,
            description: &'a str,
            total_copies: u32,
            available_copies: u32,
        }
        Wire {
            title: &self.title,
            author: &self.author,
            category: &self.category,
            description: &self.description,
            total_copies: self.total_copies,
            available_copies: self.total_copies,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Reserved,
    Returned,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: ReservationStatus,
    #[serde(rename = "bookTitle", default)]
    pub book_title: Option<String>,
    #[serde(rename = "reservationDate", default)]
    pub reservation_date: Option<DateTime<Utc>>,
    #[serde(rename = "returnByDate", default)]
    pub return_by_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(rename = "isBlocked", default)]
    pub is_blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOverview {
    pub user: UserRecord,
    pub reservations: Vec<Reservation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn book_page_from_backend_shape() {
        let page: BookPage = serde_json::from_value(json!({
            "books": [{"_id": "b1", "title": "Dune", "author": "Herbert", "category": "SF", "availableCopies": 0}],
            "totalItems": 31
        }))
        .unwrap();
        assert_eq!(page.total_items, 31);
        assert!(!page.books[0].is_available());
    }

    #[test]
    fn new_book_sends_all_copies_available() {
        let nb = NewBook {
            title: "T".into(),
            author: "A".into(),
            category: "C".into(),
            description: "D".into(),
            total_copies: 3,
        };
        let v = serde_json::to_value(&nb).unwrap();
        assert_eq!(v["totalCopies"], 3);
        assert_eq!(v["availableCopies"], 3);
    }

    #[test]
    fn reservation_status_tolerates_unknown_values() {
        let r: Reservation = serde_json::from_value(json!({
            "_id": "r1", "status": "overdue", "returnByDate": "2024-05-01T10:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(r.status, ReservationStatus::Other);
        assert!(r.return_by_date.is_some());
    }
}
