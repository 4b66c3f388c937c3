use crate::application::{
    dependencies::ServiceDependencies,
    errors::{ApplicationError, Result},
    unit_of_work::UnitOfWork,
};
use crate::domain::{
    self, BookId, Loan, LoanId, UserId,
    commands::{LendBook, ReturnLoan},
};
use crate::ports::LoanDetail;
use chrono::NaiveDate;
use serde::Serialize;

/// 返却確認の詳細
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanReturnDetail {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub book_title: String,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

/// 全貸出を一覧する
///
/// 論理削除済みの書籍に対する貸出も、正しい書名で表示できるよう
/// 常にフルビューで書籍を解決する。
pub async fn list_loans(deps: &ServiceDependencies) -> Result<Vec<LoanDetail>> {
    deps.entity_store
        .list_loans(true)
        .await
        .map_err(ApplicationError::Store)
}

/// 書籍を貸し出す
///
/// ビジネスルール（この順で判定し、最初に失敗した条件のみを返す）：
/// - 利用者が存在すること
/// - 書籍が存在すること（論理削除済みの書籍は貸し出せない）
/// - 貸出可能な在庫があること
/// - 返却期限が明日以降であること（未指定なら1か月後）
///
/// 判定はすべて変更前に行い、在庫の減算と貸出の登録は1回のコミットで反映する。
///
/// # 戻り値
/// 作成された貸出（Active）
pub async fn create_loan(deps: &ServiceDependencies, cmd: LendBook) -> Result<Loan> {
    let mut uow = UnitOfWork::begin(deps).await?;

    // 1. 利用者の存在確認
    let user = uow
        .find_user(cmd.user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    // 2. 書籍の存在確認（ライブビュー）
    let book = uow
        .find_book(cmd.book_id, false)
        .await?
        .ok_or(ApplicationError::BookNotFound)?;

    // 3. ドメイン層の純粋関数で在庫と返却期限を判定
    let today = deps.clock.today();
    let (book_after, loan) =
        domain::loan::lend_book(&book, user.id, cmd.expiration_date, today)?;

    // 4. 在庫の減算と貸出の登録を同じ単位でコミット
    uow.update(book_after);
    uow.add(loan.clone());
    uow.commit().await?;

    tracing::info!(
        "Loan {} created: book {} to user {} until {}",
        loan.id,
        loan.book_id,
        loan.user_id,
        loan.expiration_date
    );
    Ok(loan)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 既に返却済みでないこと（返却は1回のみ）
/// - 書籍が論理削除済みでも返却できる（フルビューで解決）
///
/// 返却日の設定と在庫の加算は1回のコミットで反映する。
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnLoan) -> Result<LoanReturnDetail> {
    let mut uow = UnitOfWork::begin(deps).await?;

    // 1. 貸出の存在確認
    let loan = uow
        .find_loan(cmd.loan_id)
        .await?
        .ok_or(ApplicationError::LoanNotFound)?;

    // 2. 返却済みなら何も変更しない
    if !loan.is_active() {
        return Err(ApplicationError::LoanAlreadyReturned);
    }

    // 3. 参照先の解決（書籍はフルビュー）
    let book = uow
        .find_book(loan.book_id, true)
        .await?
        .ok_or(ApplicationError::BookNotFound)?;
    let user = uow
        .find_user(loan.user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    // 4. ドメイン層の純粋関数を呼び出し
    let (returned, book_after) = domain::loan::return_loan(&loan, &book, deps.clock.today())?;

    // 5. 返却と在庫の加算を同じ単位でコミット
    uow.update(returned.clone());
    uow.update(book_after);
    uow.commit().await?;

    tracing::info!("Loan {} returned", returned.id);

    Ok(LoanReturnDetail {
        loan_id: returned.id,
        book_id: book.id,
        user_id: user.id,
        user_name: user.name,
        user_email: user.email,
        book_title: book.title,
        start_date: returned.start_date,
        expiration_date: returned.expiration_date,
        return_date: returned.return_date,
    })
}
