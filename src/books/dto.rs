use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;
use uuid::Uuid;

use crate::books::model::Book;
use crate::books::validate::validate_book;
use crate::error::ApiError;

time::serde::format_description!(published_format, Date, "[year]-[month]-[day]");

/// Book fields as supplied by the client. All optional: creation
/// reports missing fields as validation errors, updates merge only
/// what is present. `id` and owner are never accepted from the body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, with = "published_format::option")]
    pub date_published: Option<Date>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
}

impl BookPayload {
    /// Builds a complete record, aggregating missing-field and
    /// rule violations into a single 422.
    pub fn into_book(self, id: Uuid, user: Option<Uuid>) -> Result<Book, ApiError> {
        let mut missing = Vec::new();
        let mut require = |name: &str| missing.push(format!("{name} field is required"));

        if self.title.is_none() {
            require("title");
        }
        if self.author.is_none() {
            require("author");
        }
        if self.price.is_none() {
            require("price");
        }
        if self.date_published.is_none() {
            require("datePublished");
        }
        if self.pages.is_none() {
            require("pages");
        }
        if self.publisher.is_none() {
            require("publisher");
        }
        if self.description.is_none() {
            require("description");
        }
        if self.isbn.is_none() {
            require("isbn");
        }
        if !missing.is_empty() {
            return Err(ApiError::validation(missing));
        }

        let book = Book {
            id,
            title: self.title.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            date_published: self.date_published.unwrap_or(Date::MIN),
            pages: self.pages.unwrap_or_default(),
            publisher: self.publisher.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            isbn: self.isbn.unwrap_or_default(),
            user,
        };

        let messages = validate_book(&book);
        if !messages.is_empty() {
            return Err(ApiError::validation(messages));
        }
        Ok(book)
    }

    /// Merges the supplied fields into an existing record, leaving
    /// `id` and owner untouched.
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(date_published) = self.date_published {
            book.date_published = date_published;
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
        if let Some(publisher) = self.publisher {
            book.publisher = publisher;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    25
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub select: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectQuery {
    #[serde(default)]
    pub select: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageDescriptor {
    pub page: u64,
    pub limit: u64,
}

/// `next`/`prev` appear only when that page exists.
#[derive(Debug, Serialize, Default)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub status: bool,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn full_payload() -> BookPayload {
        serde_json::from_value(serde_json::json!({
            "title": "A Title",
            "author": "An Author",
            "price": 12.5,
            "datePublished": "2020-01-15",
            "pages": 200,
            "publisher": "A Publisher",
            "description": "d".repeat(150),
            "isbn": "0-306-40615-2"
        }))
        .expect("payload")
    }

    #[test]
    fn into_book_builds_a_valid_record() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let book = full_payload().into_book(id, Some(owner)).expect("valid");
        assert_eq!(book.id, id);
        assert_eq!(book.user, Some(owner));
        assert_eq!(book.date_published, date!(2020 - 01 - 15));
    }

    #[test]
    fn into_book_reports_all_missing_fields() {
        let payload: BookPayload = serde_json::from_value(serde_json::json!({})).expect("empty");
        let err = payload.into_book(Uuid::new_v4(), None).unwrap_err();
        let message = err.to_string();
        for field in [
            "title",
            "author",
            "price",
            "datePublished",
            "pages",
            "publisher",
            "description",
            "isbn",
        ] {
            assert!(
                message.contains(&format!("{field} field is required")),
                "missing message for {field}"
            );
        }
    }

    #[test]
    fn unknown_body_fields_are_ignored() {
        // Supplying `id` or `user` in the body has no effect.
        let payload: BookPayload = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "user": Uuid::new_v4(),
            "title": "New Title"
        }))
        .expect("payload");
        assert_eq!(payload.title.as_deref(), Some("New Title"));
    }

    #[test]
    fn apply_merges_only_supplied_fields() {
        let mut book = full_payload()
            .into_book(Uuid::new_v4(), None)
            .expect("valid");
        let original_id = book.id;

        let patch: BookPayload = serde_json::from_value(serde_json::json!({
            "title": "Renamed",
            "pages": 321
        }))
        .expect("patch");
        patch.apply(&mut book);

        assert_eq!(book.id, original_id);
        assert_eq!(book.title, "Renamed");
        assert_eq!(book.pages, 321);
        assert_eq!(book.author, "An Author");
    }
}
