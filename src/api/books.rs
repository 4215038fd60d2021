use crate::error::{AppError, AppResult};
use crate::pipeline::{OutboundRequest, Transport};

use super::models::{Book, BookPage, MessageResponse, NewBook};
use super::{seg, LibraryClient};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

impl<T: Transport> LibraryClient<T> {
    /// One page of the catalogue. `page` is zero-based; the backend counts from one.
    pub async fn list_books(&self, search: &str, page: u32, limit: u32) -> AppResult<BookPage> {
        let req = OutboundRequest::get("/books/")
            .with_query("search", search.trim())
            .with_query("page", u64::from(page) + 1)
            .with_query("limit", limit.max(1));
        self.pipeline.json(req).await
    }

    pub async fn get_book(&self, book_id: &str) -> AppResult<Book> {
        self.pipeline.json(OutboundRequest::get(format!("/books/{}", seg(book_id)))).await
    }

    pub async fn create_book(&self, book: &NewBook) -> AppResult<String> {
        if book.title.trim().is_empty() {
            return Err(AppError::user("title_required", "Title is required"));
        }
        let req = OutboundRequest::post("/books/").with_json(book)?;
        let resp: MessageResponse = self.pipeline.json(req).await?;
        Ok(resp.message.unwrap_or_else(|| "Book added successfully".to_string()))
    }
}

/// Number of pages needed for `total` items at `limit` per page.
pub fn page_count(total: u64, limit: u32) -> u64 {
    let limit = u64::from(limit.max(1));
    total.div_ceil(limit)
}
