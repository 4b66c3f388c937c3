use crate::domain::{book::register_book, user::register_user};
use crate::ports::{ChangeSet, EntityStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const BOOKS_FILE: &str = "books_mock_data.json";
pub const USERS_FILE: &str = "users_mock_data.json";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Deserialize)]
struct SeedBook {
    title: String,
    author: String,
    total_copies: u32,
    #[serde(default)]
    available: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    name: String,
    email: String,
}

/// What a seeding run inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub books: usize,
    pub users: usize,
    /// The store already had data, so nothing was loaded
    pub skipped: bool,
}

/// Read a JSON array from `dir/file`; a missing file yields `None`
fn read_seed_file<T: for<'de> Deserialize<'de>>(
    dir: &Path,
    file: &str,
) -> Result<Option<Vec<T>>, SeedError> {
    let path = dir.join(file);

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Seed file {} not found, skipping", path.display());
            return Ok(None);
        }
        Err(source) => return Err(SeedError::Read { path, source }),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| SeedError::Parse { path, source })
}

/// Populate an empty store from the seed JSON files in `dir`
///
/// Books and users are inserted in a single batch. A store that already holds
/// any book or user is left untouched.
pub async fn load_seed_data(store: &dyn EntityStore, dir: &Path) -> Result<SeedSummary, SeedError> {
    if !store.is_empty().await.map_err(SeedError::Store)? {
        tracing::info!("Store already contains data, skipping seed");
        return Ok(SeedSummary {
            skipped: true,
            ..Default::default()
        });
    }

    let books: Vec<SeedBook> = read_seed_file(dir, BOOKS_FILE)?.unwrap_or_default();
    let users: Vec<SeedUser> = read_seed_file(dir, USERS_FILE)?.unwrap_or_default();

    let mut changes = ChangeSet::new();
    for seed in &books {
        let mut book = register_book(seed.title.clone(), seed.author.clone(), seed.total_copies);
        if let Some(available) = seed.available {
            book.available = available.min(book.total_copies);
        }
        changes.add(book);
    }
    for seed in &users {
        changes.add(register_user(seed.name.clone(), seed.email.clone()));
    }

    if !changes.is_empty() {
        let tx = store.begin().await.map_err(SeedError::Store)?;
        tx.persist(changes).await.map_err(SeedError::Store)?;
    }

    let summary = SeedSummary {
        books: books.len(),
        users: users.len(),
        skipped: false,
    };
    tracing::info!(
        "Seeded {} book(s) and {} user(s) from {}",
        summary.books,
        summary.users,
        dir.display()
    );
    Ok(summary)
}
