use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{
    Book, LendBookError, LoanId, ReturnLoanError, UserId,
    book::{check_in_copy, check_out_copy},
};

/// 返却期限を指定しなかった場合の貸出期間（月数）
pub const DEFAULT_LOAN_MONTHS: u32 = 1;

/// 貸出の状態
///
/// Active → Returned の一方向のみ。Returnedは終端状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanState {
    /// 貸出中
    Active,
    /// 返却済み
    Returned { returned_on: NaiveDate },
}

/// Loan - 1冊の書籍の1回の貸出
///
/// 書籍と利用者はIDで参照するのみで、所有しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub book_id: super::BookId,
    pub user_id: UserId,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl Loan {
    pub fn state(&self) -> LoanState {
        match self.return_date {
            None => LoanState::Active,
            Some(returned_on) => LoanState::Returned { returned_on },
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), LoanState::Active)
    }
}

/// 純粋関数：既定の返却期限（開始日の1か月後）
pub fn default_expiration(start_date: NaiveDate) -> NaiveDate {
    start_date
        .checked_add_months(Months::new(DEFAULT_LOAN_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// 純粋関数：返却期限を決定する
///
/// - 指定なし：開始日（今日）の1か月後
/// - 指定あり：明日以降でなければならない
pub fn resolve_expiration(
    requested: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate, LendBookError> {
    match requested {
        None => Ok(default_expiration(today)),
        Some(expiration_date) => {
            let minimum = today.succ_opt().unwrap_or(NaiveDate::MAX);
            if expiration_date < minimum {
                return Err(LendBookError::ExpirationTooSoon { minimum });
            }
            Ok(expiration_date)
        }
    }
}

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール（この順で判定）：
/// - 貸出可能な在庫があること
/// - 返却期限が明日以降であること（未指定なら1か月後）
///
/// 副作用なし。在庫を1減らした書籍と新しい貸出を返す。
pub fn lend_book(
    book: &Book,
    user_id: UserId,
    requested_expiration: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(Book, Loan), LendBookError> {
    if book.available == 0 {
        return Err(LendBookError::NoAvailableCopies);
    }

    let expiration_date = resolve_expiration(requested_expiration, today)?;

    let loan = Loan {
        id: LoanId::new(),
        book_id: book.id,
        user_id,
        start_date: today,
        expiration_date,
        return_date: None,
    };

    Ok((check_out_copy(book), loan))
}

/// 純粋関数：書籍を返却する
///
/// 返却は1回のみ。副作用なし。返却済みの貸出と在庫を1戻した書籍を返す。
pub fn return_loan(
    loan: &Loan,
    book: &Book,
    today: NaiveDate,
) -> Result<(Loan, Book), ReturnLoanError> {
    if let LoanState::Returned { .. } = loan.state() {
        return Err(ReturnLoanError::AlreadyReturned);
    }

    let returned = Loan {
        return_date: Some(today),
        ..loan.clone()
    };

    Ok((returned, check_in_copy(book)))
}

/// 純粋関数：指定日に期限を迎える貸出中の貸出か
pub fn expires_on(loan: &Loan, date: NaiveDate) -> bool {
    loan.is_active() && loan.expiration_date == date
}
