use crate::domain::{Book, BookId, Loan, LoanId, User, UserId};
use crate::ports::entity_store::{
    ChangeSet, EntityStore as EntityStoreTrait, EntryState, LoanDetail, ReminderCandidate, Result,
    StoreTransaction, TrackedEntity,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, postgres::PgRow};

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// Convert a non-negative INTEGER column into a copy count
fn to_copies(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| invalid_data(format!("{} out of range: {}", column, value)))
}

/// Convert a copy count into an INTEGER column value
fn to_column(value: u32, column: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| invalid_data(format!("{} out of range: {}", column, value)))
}

fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        id: BookId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        total_copies: to_copies(row.try_get("total_copies")?, "total_copies")?,
        available: to_copies(row.try_get("available")?, "available")?,
        is_deleted: row.try_get("is_deleted")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn map_row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
    })
}

fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    Ok(Loan {
        id: LoanId::from_uuid(row.try_get("id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        start_date: row.try_get("start_date")?,
        expiration_date: row.try_get("expiration_date")?,
        return_date: row.try_get("return_date")?,
    })
}

fn map_row_to_loan_detail(row: &PgRow) -> Result<LoanDetail> {
    Ok(LoanDetail {
        loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        user_email: row.try_get("user_email")?,
        book_title: row.try_get("book_title")?,
        start_date: row.try_get("start_date")?,
        expiration_date: row.try_get("expiration_date")?,
        return_date: row.try_get("return_date")?,
    })
}

fn map_row_to_reminder_candidate(row: &PgRow) -> Result<ReminderCandidate> {
    Ok(ReminderCandidate {
        loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
        user_name: row.try_get("user_name")?,
        user_email: row.try_get("user_email")?,
        book_title: row.try_get("book_title")?,
        expiration_date: row.try_get("expiration_date")?,
    })
}

/// Fail when an UPDATE/DELETE did not hit exactly one row
fn expect_one_row(rows_affected: u64, kind: &str, id: uuid::Uuid) -> Result<()> {
    if rows_affected != 1 {
        return Err(invalid_data(format!("{} {} does not exist", kind, id)));
    }
    Ok(())
}

/// PostgreSQL implementation of EntityStore
///
/// Books, users and loans are stored in plain tables. Tombstoned books stay in
/// the `books` table with `is_deleted = TRUE`.
pub struct EntityStore {
    pool: PgPool,
}

impl EntityStore {
    /// Create a new EntityStore with a PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Transaction wrapper
///
/// Book and loan reads take row locks (`FOR UPDATE`) so concurrent lend/return/delete
/// calls on the same rows are serialized until commit or rollback.
struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

async fn persist_book(conn: &mut PgConnection, state: EntryState, book: &Book) -> Result<()> {
    match state {
        EntryState::Added => {
            sqlx::query(
                r#"
                INSERT INTO books (id, title, author, total_copies, available, is_deleted, deleted_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(book.id.value())
            .bind(&book.title)
            .bind(&book.author)
            .bind(to_column(book.total_copies, "total_copies")?)
            .bind(to_column(book.available, "available")?)
            .bind(book.is_deleted)
            .bind(book.deleted_at)
            .execute(&mut *conn)
            .await?;
        }
        EntryState::Modified => {
            let result = sqlx::query(
                r#"
                UPDATE books
                SET title = $2,
                    author = $3,
                    total_copies = $4,
                    available = $5,
                    is_deleted = $6,
                    deleted_at = $7
                WHERE id = $1
                "#,
            )
            .bind(book.id.value())
            .bind(&book.title)
            .bind(&book.author)
            .bind(to_column(book.total_copies, "total_copies")?)
            .bind(to_column(book.available, "available")?)
            .bind(book.is_deleted)
            .bind(book.deleted_at)
            .execute(&mut *conn)
            .await?;
            expect_one_row(result.rows_affected(), "book", book.id.value())?;
        }
        EntryState::Deleted => {
            let result = sqlx::query("DELETE FROM books WHERE id = $1")
                .bind(book.id.value())
                .execute(&mut *conn)
                .await?;
            expect_one_row(result.rows_affected(), "book", book.id.value())?;
        }
    }
    Ok(())
}

async fn persist_user(conn: &mut PgConnection, state: EntryState, user: &User) -> Result<()> {
    match state {
        EntryState::Added => {
            sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
                .bind(user.id.value())
                .bind(&user.name)
                .bind(&user.email)
                .execute(&mut *conn)
                .await?;
        }
        EntryState::Modified => {
            let result = sqlx::query("UPDATE users SET name = $2, email = $3 WHERE id = $1")
                .bind(user.id.value())
                .bind(&user.name)
                .bind(&user.email)
                .execute(&mut *conn)
                .await?;
            expect_one_row(result.rows_affected(), "user", user.id.value())?;
        }
        EntryState::Deleted => {
            let result = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user.id.value())
                .execute(&mut *conn)
                .await?;
            expect_one_row(result.rows_affected(), "user", user.id.value())?;
        }
    }
    Ok(())
}

async fn persist_loan(conn: &mut PgConnection, state: EntryState, loan: &Loan) -> Result<()> {
    match state {
        EntryState::Added => {
            sqlx::query(
                r#"
                INSERT INTO loans (id, book_id, user_id, start_date, expiration_date, return_date)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(loan.id.value())
            .bind(loan.book_id.value())
            .bind(loan.user_id.value())
            .bind(loan.start_date)
            .bind(loan.expiration_date)
            .bind(loan.return_date)
            .execute(&mut *conn)
            .await?;
        }
        EntryState::Modified => {
            let result = sqlx::query(
                r#"
                UPDATE loans
                SET expiration_date = $2,
                    return_date = $3
                WHERE id = $1
                "#,
            )
            .bind(loan.id.value())
            .bind(loan.expiration_date)
            .bind(loan.return_date)
            .execute(&mut *conn)
            .await?;
            expect_one_row(result.rows_affected(), "loan", loan.id.value())?;
        }
        EntryState::Deleted => {
            let result = sqlx::query("DELETE FROM loans WHERE id = $1")
                .bind(loan.id.value())
                .execute(&mut *conn)
                .await?;
            expect_one_row(result.rows_affected(), "loan", loan.id.value())?;
        }
    }
    Ok(())
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn find_book(&mut self, book_id: BookId, include_deleted: bool) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author, total_copies, available, is_deleted, deleted_at
            FROM books
            WHERE id = $1 AND ($2 OR NOT is_deleted)
            FOR UPDATE
            "#,
        )
        .bind(book_id.value())
        .bind(include_deleted)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = $1")
            .bind(user_id.value())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(map_row_to_user).transpose()
    }

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT id, book_id, user_id, start_date, expiration_date, return_date
            FROM loans
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(loan_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn has_active_loans(&mut self, book_id: BookId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM loans WHERE book_id = $1 AND return_date IS NULL
            )
            "#,
        )
        .bind(book_id.value())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    /// Write every entry inside the transaction, then commit
    ///
    /// Any failure drops the transaction, which rolls the whole batch back.
    async fn persist(self: Box<Self>, changes: ChangeSet) -> Result<()> {
        let mut tx = self.tx;

        for entry in changes.into_entries() {
            match &entry.entity {
                TrackedEntity::Book(book) => persist_book(&mut *tx, entry.state, book).await?,
                TrackedEntity::User(user) => persist_user(&mut *tx, entry.state, user).await?,
                TrackedEntity::Loan(loan) => persist_loan(&mut *tx, entry.state, loan).await?,
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl EntityStoreTrait for EntityStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn list_books(&self, include_deleted: bool) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, total_copies, available, is_deleted, deleted_at
            FROM books
            WHERE $1 OR NOT is_deleted
            ORDER BY seq ASC
            "#,
        )
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn get_book(&self, book_id: BookId, include_deleted: bool) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author, total_copies, available, is_deleted, deleted_at
            FROM books
            WHERE id = $1 AND ($2 OR NOT is_deleted)
            "#,
        )
        .bind(book_id.value())
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, email FROM users ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_user).collect()
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = $1")
            .bind(user_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_user).transpose()
    }

    async fn list_loans(&self, include_deleted: bool) -> Result<Vec<LoanDetail>> {
        let rows = sqlx::query(
            r#"
            SELECT
                l.id AS loan_id,
                l.user_id,
                l.book_id,
                u.email AS user_email,
                b.title AS book_title,
                l.start_date,
                l.expiration_date,
                l.return_date
            FROM loans l
            JOIN books b ON b.id = l.book_id
            JOIN users u ON u.id = l.user_id
            WHERE $1 OR NOT b.is_deleted
            ORDER BY l.seq ASC
            "#,
        )
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan_detail).collect()
    }

    async fn find_active_loans_expiring_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT
                l.id AS loan_id,
                u.name AS user_name,
                u.email AS user_email,
                b.title AS book_title,
                l.expiration_date
            FROM loans l
            JOIN books b ON b.id = l.book_id
            JOIN users u ON u.id = l.user_id
            WHERE l.return_date IS NULL AND l.expiration_date = $1
            ORDER BY l.seq ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_reminder_candidate).collect()
    }

    async fn is_empty(&self) -> Result<bool> {
        let empty: bool = sqlx::query_scalar(
            "SELECT NOT EXISTS (SELECT 1 FROM books) AND NOT EXISTS (SELECT 1 FROM users)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(empty)
    }
}
