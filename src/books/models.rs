//! Catalog data types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub year_published: i32,
    pub times_borrowed: i64, // mock borrowing count
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub year_published: i32,
    /// Only honoured on create; updates keep the stored count
    pub times_borrowed: i64,
}

impl BookInput {
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Missing required fields: {}", missing.join(", ")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub isbn: String,
    pub year_published: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorGroup {
    pub author: String,
    pub books: Vec<BookSummary>,
}

/// Review data from the (simulated) external source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDetails {
    pub book_id: i64,
    pub review_source: String,
    pub rating: f64,
    pub reviews: u32,
}
