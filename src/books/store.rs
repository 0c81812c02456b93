//! Book Storage
//! Mission: Mirror the catalog table in SQLite

use crate::books::models::{AuthorGroup, Book, BookInput, BookSummary};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::info;

/// How many books the top-borrowed query returns
pub const TOP_BORROWED_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("Book {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub struct BookStore {
    conn: Mutex<Connection>,
}

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        isbn: row.get(3)?,
        year_published: row.get(4)?,
        times_borrowed: row.get(5)?,
    })
}

const SELECT_BOOK: &str =
    "SELECT id, title, author, isbn, year_published, times_borrowed FROM books";

impl BookStore {
    pub fn new(db_path: &str) -> Result<Self, BookError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, BookError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, BookError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                isbn TEXT NOT NULL,
                year_published INTEGER NOT NULL,
                times_borrowed INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn list(&self) -> Result<Vec<Book>, BookError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_BOOK} ORDER BY id"))?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }

    pub fn get(&self, id: i64) -> Result<Option<Book>, BookError> {
        let conn = self.conn.lock();
        let book = conn
            .query_row(
                &format!("{SELECT_BOOK} WHERE id = ?1"),
                params![id],
                row_to_book,
            )
            .optional()?;
        Ok(book)
    }

    pub fn create(&self, input: &BookInput) -> Result<Book, BookError> {
        input.validate().map_err(BookError::Validation)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books (title, author, isbn, year_published, times_borrowed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                input.title,
                input.author,
                input.isbn,
                input.year_published,
                input.times_borrowed,
            ],
        )?;

        let book = Book {
            id: conn.last_insert_rowid(),
            title: input.title.clone(),
            author: input.author.clone(),
            isbn: input.isbn.clone(),
            year_published: input.year_published,
            times_borrowed: input.times_borrowed,
        };

        info!("📚 Added book {} ({})", book.id, book.title);
        Ok(book)
    }

    /// Overwrite title, author, isbn and year; the borrow count is kept
    pub fn update(&self, id: i64, input: &BookInput) -> Result<(), BookError> {
        input.validate().map_err(BookError::Validation)?;

        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            "UPDATE books SET title = ?1, author = ?2, isbn = ?3, year_published = ?4
             WHERE id = ?5",
            params![
                input.title,
                input.author,
                input.isbn,
                input.year_published,
                id
            ],
        )?;

        if rows_affected == 0 {
            return Err(BookError::NotFound(id));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<(), BookError> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;

        if rows_affected == 0 {
            return Err(BookError::NotFound(id));
        }

        info!("🗑️  Deleted book {}", id);
        Ok(())
    }

    /// Books grouped by author, authors ascending
    pub fn grouped_by_author(&self) -> Result<Vec<AuthorGroup>, BookError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_BOOK} ORDER BY author, id"))?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: Vec<AuthorGroup> = Vec::new();
        for book in books {
            let summary = BookSummary {
                id: book.id,
                title: book.title,
                isbn: book.isbn,
                year_published: book.year_published,
            };
            match groups.last_mut() {
                Some(group) if group.author == book.author => group.books.push(summary),
                _ => groups.push(AuthorGroup {
                    author: book.author,
                    books: vec![summary],
                }),
            }
        }

        Ok(groups)
    }

    /// Most borrowed first
    pub fn top_borrowed(&self, limit: usize) -> Result<Vec<Book>, BookError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_BOOK} ORDER BY times_borrowed DESC, id LIMIT ?1"
        ))?;
        let books = stmt
            .query_map(params![limit as i64], row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(books)
    }
}
