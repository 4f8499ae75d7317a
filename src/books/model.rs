use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::store::Record;

time::serde::format_description!(published_format, Date, "[year]-[month]-[day]");

/// Book record. `id` and `user` are immutable once created; updates
/// merge the remaining fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub price: f64,
    #[serde(with = "published_format")]
    pub date_published: Date,
    pub pages: u32,
    pub publisher: String,
    pub description: String,
    pub isbn: String,
    /// Owning user; absent for books created under the open policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Uuid>,
}

impl Record for Book {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Book {
    /// `(title, author)` uniqueness is case-insensitive.
    pub fn same_title_and_author(&self, title: &str, author: &str) -> bool {
        self.title.eq_ignore_ascii_case(title) && self.author.eq_ignore_ascii_case(author)
    }
}
