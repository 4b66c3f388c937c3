use crate::application::{
    dependencies::ServiceDependencies,
    errors::{ApplicationError, Result},
    unit_of_work::UnitOfWork,
};
use crate::domain::{
    self, Book, BookChanges, BookId,
    commands::{CreateBook, DeleteBook, UpdateBook},
};

/// 書籍一覧を取得する
///
/// `include_deleted` が false の場合、論理削除済みの書籍は含まない。
pub async fn list_books(deps: &ServiceDependencies, include_deleted: bool) -> Result<Vec<Book>> {
    deps.entity_store
        .list_books(include_deleted)
        .await
        .map_err(ApplicationError::Store)
}

/// IDで書籍を取得する
///
/// # エラー
/// - BookNotFound: 指定したビューに書籍が存在しない
pub async fn get_book(
    deps: &ServiceDependencies,
    book_id: BookId,
    include_deleted: bool,
) -> Result<Book> {
    deps.entity_store
        .get_book(book_id, include_deleted)
        .await
        .map_err(ApplicationError::Store)?
        .ok_or(ApplicationError::BookNotFound)
}

/// 書籍を登録する
///
/// 総冊数が0以上であることは入力検証で保証済み（u32）。
pub async fn create_book(deps: &ServiceDependencies, cmd: CreateBook) -> Result<Book> {
    let book = domain::book::register_book(cmd.title, cmd.author, cmd.total_copies);

    let mut uow = UnitOfWork::begin(deps).await?;
    uow.add(book.clone());
    uow.commit().await?;

    tracing::info!("Book {} registered ({} copies)", book.id, book.total_copies);
    Ok(book)
}

/// 書籍を部分更新する
///
/// ビジネスルール：
/// - 論理削除済みの書籍は更新できない（NotFound）
/// - 総冊数の増減分だけ貸出可能数も増減する
/// - 貸出可能数が負になる変更は Conflict（何も変更しない）
pub async fn update_book(deps: &ServiceDependencies, cmd: UpdateBook) -> Result<Book> {
    let mut uow = UnitOfWork::begin(deps).await?;

    let book = uow
        .find_book(cmd.book_id, false)
        .await?
        .ok_or(ApplicationError::BookNotFound)?;

    let changes = BookChanges {
        title: cmd.title,
        author: cmd.author,
        total_copies: cmd.total_copies,
    };
    let updated = domain::book::update_book(&book, changes)?;

    uow.update(updated.clone());
    uow.commit().await?;

    Ok(updated)
}

/// 書籍を削除する
///
/// 削除はコミット時に論理削除インターセプターによってトゥームストーン化される。
///
/// # エラー
/// - BookNotFound: 書籍が存在しない、または既に削除済み
/// - BookHasActiveLoan: 未返却の貸出がある
pub async fn delete_book(deps: &ServiceDependencies, cmd: DeleteBook) -> Result<()> {
    let mut uow = UnitOfWork::begin(deps).await?;

    let book = uow
        .find_book(cmd.book_id, false)
        .await?
        .ok_or(ApplicationError::BookNotFound)?;

    if uow.has_active_loans(book.id).await? {
        return Err(ApplicationError::BookHasActiveLoan);
    }

    uow.remove(book);
    uow.commit().await?;

    tracing::info!("Book {} deleted", cmd.book_id);
    Ok(())
}
