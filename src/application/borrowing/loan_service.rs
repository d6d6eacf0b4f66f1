use crate::domain::{
    self, Borrower, BorrowerId, CopyState, DomainEvent, Loan, LoanId, RenewLoanError,
    ReturnLoanError, SanctionApplied, commands::*, sanction,
};
use chrono::{DateTime, Utc};

use super::ServiceDependencies;
use super::eligibility::check_eligibility;
use super::errors::{BorrowingError, Result};
use super::{journal, ledger};

/// 返却処理の結果
#[derive(Debug, Clone)]
pub struct LoanReturnOutcome {
    pub loan: Loan,
    /// 延滞返却の場合に科された貸出停止
    pub sanction: Option<SanctionApplied>,
}

/// 貸出を読み込むヘルパー関数
///
/// return_loan, renew_loan, get_loan で共通利用される。
async fn load_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    deps.loan_repository
        .get_by_id(loan_id)
        .await
        .map_err(BorrowingError::Storage)?
        .ok_or(BorrowingError::LoanNotFound)
}

/// 所蔵品を貸し出す
///
/// ビジネスルール：
/// - 利用者が存在し、貸出停止中でないこと
/// - 貸出方針（役割ごとの上限）を満たすこと
/// - 所蔵品が貸出可能であること
///
/// 台帳の条件付き更新を先に行い、貸出の保存に失敗した場合は台帳を元に戻す。
/// 同じ所蔵品への同時要求は、台帳の更新に成功した1件だけが成立する。
pub async fn create_loan(deps: &ServiceDependencies, cmd: CreateLoan) -> Result<Loan> {
    // 1. 事前検証（副作用なし）
    let eligible = check_eligibility(deps, cmd.borrower_id, cmd.copy, cmd.requested_at).await?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (loan, event) = domain::loan::open_loan(
        eligible.borrower.borrower_id,
        cmd.copy,
        None,
        cmd.requested_at,
        &deps.terms,
    );

    // 3. 台帳を更新（available → loaned）
    let transition =
        ledger::mark_loaned(&deps.copy_ledger, cmd.copy, CopyState::Available, cmd.requested_at)
            .await?;

    // 4. 貸出を保存（失敗時は補償）
    if let Err(e) = deps.loan_repository.insert(loan.clone()).await {
        ledger::revert(&deps.copy_ledger, &transition, cmd.requested_at).await;
        return Err(BorrowingError::Storage(e));
    }

    // 5. ジャーナルに記録
    journal::record(deps, vec![DomainEvent::LoanOpened(event)]).await;

    tracing::info!(
        loan_id = %loan.loan_id,
        borrower_id = %loan.borrower_id,
        copy_id = %loan.copy.id(),
        due_date = %loan.due_date,
        "Loan created"
    );

    Ok(loan)
}

/// 貸出を返却する
///
/// ビジネスルール：
/// - 貸出が存在し、返却済みでないこと
/// - 延滞していても返却は受け付ける
/// - 延滞返却の場合、最終状態に関わらず延滞日数分の貸出停止を科す
/// - 所蔵品は選択された最終状態になり、備考が記録される
///
/// 書き込み順は 台帳 → 貸出停止 → 貸出。
/// 貸出の更新が最後に成功した時点で返却が確定し、それ以前の失敗は
/// 台帳と利用者を元に戻して再試行できる状態にする。
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnLoan) -> Result<LoanReturnOutcome> {
    // 1. 貸出を読み込む
    let loan = load_loan(deps, cmd.loan_id).await?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (returned, event) = domain::loan::return_loan(&loan, cmd.returned_at, cmd.final_state)
        .map_err(|e| match e {
            ReturnLoanError::AlreadyReturned => BorrowingError::LoanAlreadyReturned,
        })?;

    // 3. 台帳を更新（loaned → 最終状態）
    let transition = ledger::mark_state(
        &deps.copy_ledger,
        loan.copy,
        CopyState::Loaned,
        CopyState::from(cmd.final_state),
        cmd.notes.as_deref(),
        cmd.returned_at,
    )
    .await?;

    // 4. 延滞返却の貸出停止（失敗時は台帳を戻す）
    let sanction = match apply_sanction(deps, &returned, cmd.returned_at).await {
        Ok(sanction) => sanction,
        Err(e) => {
            ledger::revert(&deps.copy_ledger, &transition, cmd.returned_at).await;
            return Err(e);
        }
    };

    // 5. 貸出を更新（失敗時は台帳と貸出停止を戻す）
    let saved = deps.loan_repository.update(returned.clone(), &loan).await;
    if !matches!(saved, Ok(true)) {
        ledger::revert(&deps.copy_ledger, &transition, cmd.returned_at).await;
        if let Some((previous, _)) = &sanction {
            restore_borrower(deps, previous.clone()).await;
        }
        return Err(match saved {
            Err(e) => BorrowingError::Storage(e),
            Ok(_) => BorrowingError::StaleRecord,
        });
    }

    let sanction = sanction.map(|(_, applied)| applied);
    let mut events = vec![DomainEvent::LoanReturned(event)];
    if let Some(applied) = &sanction {
        events.push(DomainEvent::SanctionApplied(applied.clone()));
    }

    // 6. ジャーナルに記録
    journal::record_each(deps, events).await;

    tracing::info!(
        loan_id = %returned.loan_id,
        copy_id = %returned.copy.id(),
        final_state = CopyState::from(cmd.final_state).as_str(),
        late = sanction.is_some(),
        "Loan returned"
    );

    Ok(LoanReturnOutcome {
        loan: returned,
        sanction,
    })
}

/// 延滞返却であれば利用者に貸出停止を科す
///
/// 科した場合は、補償用に更新前の利用者とイベントを返す。
async fn apply_sanction(
    deps: &ServiceDependencies,
    loan: &Loan,
    returned_at: DateTime<Utc>,
) -> Result<Option<(Borrower, SanctionApplied)>> {
    let Some(borrower) = deps
        .borrower_repository
        .get_by_id(loan.borrower_id)
        .await
        .map_err(BorrowingError::Storage)?
    else {
        tracing::warn!(
            loan_id = %loan.loan_id,
            borrower_id = %loan.borrower_id,
            "Borrower of returned loan no longer exists; sanction skipped"
        );
        return Ok(None);
    };

    let Some((sanctioned, event)) =
        sanction::apply_late_return_sanction(&borrower, loan.loan_id, loan.due_date, returned_at)
    else {
        return Ok(None);
    };

    deps.borrower_repository
        .save(sanctioned)
        .await
        .map_err(BorrowingError::Storage)?;

    tracing::info!(
        borrower_id = %event.borrower_id,
        overdue_days = event.overdue_days,
        suspended_until = %event.suspended_until,
        "Late return sanction applied"
    );

    Ok(Some((borrower, event)))
}

/// 補償処理：貸出停止を科す前の利用者に戻す
async fn restore_borrower(deps: &ServiceDependencies, previous: Borrower) {
    let borrower_id = previous.borrower_id;
    match deps.borrower_repository.save(previous).await {
        Ok(()) => tracing::warn!(%borrower_id, "Reverted sanction after failed return"),
        Err(e) => tracing::error!(
            %borrower_id,
            error = %e,
            "Could not revert sanction after failed return"
        ),
    }
}

/// 貸出を延長する
///
/// ビジネスルール：
/// - 延長日数は1以上、上限以下の整数
/// - 返却済みは延長不可
/// - 貸出方針の上限は再評価しない
///
/// 読み込み後に返却・延長が先に確定していた場合は Conflict。
pub async fn renew_loan(deps: &ServiceDependencies, cmd: RenewLoan) -> Result<Loan> {
    let loan = load_loan(deps, cmd.loan_id).await?;

    let (renewed, event) =
        domain::loan::renew_loan(&loan, cmd.extra_days, cmd.renewed_at, &deps.terms).map_err(
            |e| match e {
                RenewLoanError::AlreadyReturned => BorrowingError::LoanAlreadyReturned,
                RenewLoanError::InvalidDays(days) => BorrowingError::InvalidRenewalDays(days),
            },
        )?;

    let saved = deps
        .loan_repository
        .update(renewed.clone(), &loan)
        .await
        .map_err(BorrowingError::Storage)?;
    if !saved {
        tracing::warn!(loan_id = %loan.loan_id, "Loan changed concurrently; renewal rejected");
        return Err(BorrowingError::StaleRecord);
    }

    journal::record(deps, vec![DomainEvent::LoanRenewed(event)]).await;

    tracing::info!(
        loan_id = %renewed.loan_id,
        extra_days = cmd.extra_days,
        due_date = %renewed.due_date,
        "Loan renewed"
    );

    Ok(renewed)
}

/// IDで貸出を取得する
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    load_loan(deps, loan_id).await
}

/// 貸出の履歴（開始・延長・返却）を記録順に取得する
pub async fn get_loan_history(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Vec<DomainEvent>> {
    let loan = load_loan(deps, loan_id).await?;
    journal::history(deps, loan.loan_id.value()).await
}

/// 利用者の貸出一覧（新しい順）
pub async fn list_loans_for_borrower(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_by_borrower(borrower_id)
        .await
        .map_err(BorrowingError::Storage)
}

/// 延滞中の貸出一覧（返却期限の古い順）
pub async fn list_overdue_loans(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_overdue(now)
        .await
        .map_err(BorrowingError::Storage)
}
