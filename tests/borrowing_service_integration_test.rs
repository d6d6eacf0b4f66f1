mod common;

use common::{at, setup};
use school_library_lending::application::borrowing::{self, BorrowingError, ErrorKind};
use school_library_lending::domain::commands::*;
use school_library_lending::domain::*;
use school_library_lending::ports::{CopyLedger as _, EventStore as _, LoanRepository as _};

fn create_loan_cmd(
    borrower: &Borrower,
    copy: &CopyRecord,
    requested_at: chrono::DateTime<chrono::Utc>,
) -> CreateLoan {
    CreateLoan {
        borrower_id: borrower.borrower_id,
        copy: copy.copy,
        requested_at,
    }
}

fn create_reservation_cmd(
    borrower: &Borrower,
    copy: &CopyRecord,
    requested_at: chrono::DateTime<chrono::Utc>,
) -> CreateReservation {
    CreateReservation {
        borrower_id: borrower.borrower_id,
        copy: copy.copy,
        requested_at,
    }
}

fn return_cmd(
    loan: &Loan,
    final_state: ReturnCondition,
    returned_at: chrono::DateTime<chrono::Utc>,
) -> ReturnLoan {
    ReturnLoan {
        loan_id: loan.loan_id,
        final_state,
        notes: None,
        returned_at,
    }
}

async fn copy_state(ctx: &common::TestContext, copy: &CopyRecord) -> CopyState {
    ctx.ledger
        .get(copy.copy)
        .await
        .unwrap()
        .expect("copy exists")
        .state
}

// ============================================================================
// 貸出
// ============================================================================

#[tokio::test]
async fn test_student_first_book_loan_succeeds() {
    let ctx = setup();
    let student = ctx.seed_borrower(Role::Student);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    let loan = borrowing::create_loan(&ctx.deps, create_loan_cmd(&student, &copy, now))
        .await
        .unwrap();

    assert_eq!(loan.state, LoanState::Active);
    assert_eq!(loan.start_date, now);
    assert_eq!(loan.due_date, at(2026, 1, 19, 10, 0));
    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Loaned);

    let events = ctx.events.load(loan.loan_id.value()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], DomainEvent::LoanOpened(_)));
}

#[tokio::test]
async fn test_student_second_item_is_forbidden() {
    let ctx = setup();
    let student = ctx.seed_borrower(Role::Student);
    let first = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let second = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    borrowing::create_loan(&ctx.deps, create_loan_cmd(&student, &first, now))
        .await
        .unwrap();

    let err = borrowing::create_loan(&ctx.deps, create_loan_cmd(&student, &second, now))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(err.to_string().contains("at most 1 item"));
    assert_eq!(copy_state(&ctx, &second).await, CopyState::Available);
}

#[tokio::test]
async fn test_student_pending_reservation_counts_toward_limit() {
    let ctx = setup();
    let student = ctx.seed_borrower(Role::Student);
    let reserved = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let other = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    borrowing::create_reservation(&ctx.deps, create_reservation_cmd(&student, &reserved, now))
        .await
        .unwrap();

    let err = borrowing::create_loan(&ctx.deps, create_loan_cmd(&student, &other, now))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BorrowingError::PolicyViolation(policy::PolicyViolation::StudentLimitReached)
    ));
}

#[tokio::test]
async fn test_student_cannot_borrow_resource() {
    let ctx = setup();
    let student = ctx.seed_borrower(Role::Student);
    let projector = ctx.seed_copy(ItemKind::ResourceInstance, TitleId::new());

    let err = borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&student, &projector, at(2026, 1, 5, 10, 0)),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(err.to_string(), "Students may only borrow books");
}

#[tokio::test]
async fn test_staff_may_hold_one_book_and_one_resource() {
    let ctx = setup();
    let staff = ctx.seed_borrower(Role::Staff);
    let book = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let second_book = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let resource = ctx.seed_copy(ItemKind::ResourceInstance, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    borrowing::create_loan(&ctx.deps, create_loan_cmd(&staff, &book, now))
        .await
        .unwrap();
    borrowing::create_loan(&ctx.deps, create_loan_cmd(&staff, &resource, now))
        .await
        .unwrap();

    let err = borrowing::create_loan(&ctx.deps, create_loan_cmd(&staff, &second_book, now))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BorrowingError::PolicyViolation(policy::PolicyViolation::StaffBookLimitReached)
    ));
}

#[tokio::test]
async fn test_resource_loan_after_cutoff_is_due_next_business_day() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let projector = ctx.seed_copy(ItemKind::ResourceInstance, TitleId::new());

    // 金曜 18:00 → 月曜 17:00
    let loan = borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&teacher, &projector, at(2026, 1, 9, 18, 0)),
    )
    .await
    .unwrap();

    assert_eq!(loan.due_date, at(2026, 1, 12, 17, 0));
}

#[tokio::test]
async fn test_suspended_borrower_cannot_borrow() {
    let ctx = setup();
    let now = at(2026, 1, 5, 10, 0);
    let teacher = ctx.seed_suspended_borrower(Role::Teacher, at(2026, 1, 8, 0, 0));
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    let err = borrowing::create_loan(&ctx.deps, create_loan_cmd(&teacher, &copy, now))
        .await
        .unwrap_err();

    assert!(matches!(err, BorrowingError::BorrowerSuspended(_)));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_unknown_borrower_and_copy_are_not_found() {
    let ctx = setup();
    let now = at(2026, 1, 5, 10, 0);
    let teacher = ctx.seed_borrower(Role::Teacher);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    let stranger = common::borrower(Role::Teacher);
    let err = borrowing::create_loan(&ctx.deps, create_loan_cmd(&stranger, &copy, now))
        .await
        .unwrap_err();
    assert!(matches!(err, BorrowingError::BorrowerNotFound));

    let missing = CreateLoan {
        borrower_id: teacher.borrower_id,
        copy: CopyRef::new(ItemKind::BookCopy, CopyId::new()),
        requested_at: now,
    };
    let err = borrowing::create_loan(&ctx.deps, missing).await.unwrap_err();
    assert!(matches!(err, BorrowingError::CopyNotFound));
}

#[tokio::test]
async fn test_unavailable_copy_is_bad_request() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let damaged =
        ctx.seed_copy_in_state(ItemKind::BookCopy, TitleId::new(), CopyState::Damaged);

    let err = borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&teacher, &damaged, at(2026, 1, 5, 10, 0)),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        BorrowingError::CopyNotAvailable(CopyState::Damaged)
    ));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_loans_on_same_copy_allow_exactly_one() {
    let ctx = setup();
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    let teachers: Vec<Borrower> = (0..8).map(|_| ctx.seed_borrower(Role::Teacher)).collect();

    let handles: Vec<_> = teachers
        .iter()
        .map(|teacher| {
            let deps = ctx.deps.clone();
            let cmd = create_loan_cmd(teacher, &copy, now);
            tokio::spawn(async move { borrowing::create_loan(&deps, cmd).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(
                matches!(e.kind(), ErrorKind::Conflict | ErrorKind::BadRequest),
                "unexpected error: {e}"
            ),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Loaned);

    let mut active = 0;
    for teacher in &teachers {
        active += ctx
            .loans
            .find_active_for_borrower(teacher.borrower_id)
            .await
            .unwrap()
            .len();
    }
    assert_eq!(active, 1);
}

// ============================================================================
// 返却・延長
// ============================================================================

#[tokio::test]
async fn test_late_return_applies_sanction() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    // 2025-12-22（月）から10営業日 → 2026-01-05
    let loan = borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&teacher, &copy, at(2025, 12, 22, 0, 0)),
    )
    .await
    .unwrap();
    assert_eq!(loan.due_date, at(2026, 1, 5, 0, 0));

    let outcome = borrowing::return_loan(
        &ctx.deps,
        return_cmd(&loan, ReturnCondition::Available, at(2026, 1, 8, 0, 0)),
    )
    .await
    .unwrap();

    assert_eq!(outcome.loan.state, LoanState::Returned);
    assert_eq!(outcome.loan.return_date, Some(at(2026, 1, 8, 0, 0)));

    let sanction = outcome.sanction.expect("late return is sanctioned");
    assert_eq!(sanction.overdue_days, 3);
    assert_eq!(sanction.suspended_until, at(2026, 1, 11, 0, 0));

    let sanctioned = borrowing::list_sanctioned_borrowers(&ctx.deps, at(2026, 1, 9, 0, 0))
        .await
        .unwrap();
    assert_eq!(sanctioned.len(), 1);
    assert_eq!(sanctioned[0].suspended_until, Some(at(2026, 1, 11, 0, 0)));

    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Available);
}

#[tokio::test]
async fn test_late_return_never_shortens_existing_sanction() {
    let ctx = setup();
    let teacher = ctx.seed_suspended_borrower(Role::Teacher, at(2026, 2, 1, 0, 0));
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    // 停止前に作成した貸出を、停止期間中に延滞返却する
    let (loan, _) = loan::open_loan(
        teacher.borrower_id,
        copy.copy,
        None,
        at(2025, 12, 22, 0, 0),
        &LendingTerms::default(),
    );
    ctx.loans.insert(loan.clone()).await.unwrap();
    ctx.ledger
        .compare_and_set(
            &CopyTransition {
                copy: copy.copy,
                from: CopyState::Available,
                to: CopyState::Loaned,
            },
            None,
            at(2025, 12, 22, 0, 0),
        )
        .await
        .unwrap();

    let outcome = borrowing::return_loan(
        &ctx.deps,
        return_cmd(&loan, ReturnCondition::Available, at(2026, 1, 8, 0, 0)),
    )
    .await
    .unwrap();

    let sanction = outcome.sanction.unwrap();
    assert_eq!(sanction.suspended_until, at(2026, 2, 1, 0, 0));
}

#[tokio::test]
async fn test_return_records_final_state_and_notes() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    let loan = borrowing::create_loan(&ctx.deps, create_loan_cmd(&teacher, &copy, now))
        .await
        .unwrap();

    let outcome = borrowing::return_loan(
        &ctx.deps,
        ReturnLoan {
            notes: Some("cover torn".to_string()),
            ..return_cmd(&loan, ReturnCondition::Damaged, at(2026, 1, 6, 10, 0))
        },
    )
    .await
    .unwrap();
    assert!(outcome.sanction.is_none());

    let record = ctx.ledger.get(copy.copy).await.unwrap().unwrap();
    assert_eq!(record.state, CopyState::Damaged);
    assert_eq!(record.notes, "cover torn");

    let attention = borrowing::items_for_attention(&ctx.deps).await.unwrap();
    assert_eq!(attention.len(), 1);
    assert_eq!(attention[0].copy, copy.copy);

    let err = borrowing::return_loan(
        &ctx.deps,
        return_cmd(&loan, ReturnCondition::Available, at(2026, 1, 6, 11, 0)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BorrowingError::LoanAlreadyReturned));
}

#[tokio::test]
async fn test_renew_loan_extends_due_date() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    let loan = borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&teacher, &copy, at(2026, 1, 5, 10, 0)),
    )
    .await
    .unwrap();

    let renewed = borrowing::renew_loan(
        &ctx.deps,
        RenewLoan {
            loan_id: loan.loan_id,
            extra_days: 3,
            renewed_at: at(2026, 1, 10, 9, 0),
        },
    )
    .await
    .unwrap();
    assert_eq!(renewed.due_date, at(2026, 1, 22, 10, 0));

    let stored = borrowing::get_loan(&ctx.deps, loan.loan_id).await.unwrap();
    assert_eq!(stored.due_date, renewed.due_date);

    let err = borrowing::renew_loan(
        &ctx.deps,
        RenewLoan {
            loan_id: loan.loan_id,
            extra_days: 0,
            renewed_at: at(2026, 1, 10, 9, 0),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BorrowingError::InvalidRenewalDays(0)));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_overdue_listing_and_borrower_history() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let early = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let late = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    let first = borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&teacher, &early, at(2026, 1, 5, 10, 0)),
    )
    .await
    .unwrap();
    let second = borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&teacher, &late, at(2026, 1, 6, 10, 0)),
    )
    .await
    .unwrap();

    let overdue = borrowing::list_overdue_loans(&ctx.deps, at(2026, 1, 19, 12, 0))
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].loan_id, first.loan_id);
    assert_eq!(
        loan::display_status(&overdue[0], at(2026, 1, 19, 12, 0)),
        LoanDisplayStatus::Overdue
    );

    let history = borrowing::list_loans_for_borrower(&ctx.deps, teacher.borrower_id)
        .await
        .unwrap();
    let ids: Vec<LoanId> = history.iter().map(|l| l.loan_id).collect();
    assert_eq!(ids, vec![second.loan_id, first.loan_id]);
}

// ============================================================================
// 予約
// ============================================================================

#[tokio::test]
async fn test_teacher_cannot_reserve_duplicate_title() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let title = TitleId::new();
    let on_loan = ctx.seed_copy(ItemKind::BookCopy, title);
    let same_title = ctx.seed_copy(ItemKind::BookCopy, title);
    let now = at(2026, 1, 5, 10, 0);

    borrowing::create_loan(&ctx.deps, create_loan_cmd(&teacher, &on_loan, now))
        .await
        .unwrap();

    let err = borrowing::create_reservation(
        &ctx.deps,
        create_reservation_cmd(&teacher, &same_title, now),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        BorrowingError::PolicyViolation(policy::PolicyViolation::TeacherDuplicateTitle)
    ));
    assert_eq!(copy_state(&ctx, &same_title).await, CopyState::Available);
}

#[tokio::test]
async fn test_cancel_reservation_releases_copy() {
    let ctx = setup();
    let student = ctx.seed_borrower(Role::Student);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    let reservation =
        borrowing::create_reservation(&ctx.deps, create_reservation_cmd(&student, &copy, now))
            .await
            .unwrap();
    assert_eq!(reservation.expires_at, at(2026, 1, 7, 10, 0));
    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Reserved);

    let cancelled = borrowing::cancel_reservation(&ctx.deps, reservation.reservation_id, now)
        .await
        .unwrap();
    assert_eq!(cancelled.state, ReservationState::Cancelled);
    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Available);

    let err = borrowing::cancel_reservation(&ctx.deps, reservation.reservation_id, now)
        .await
        .unwrap_err();
    assert!(matches!(err, BorrowingError::ReservationNotPending));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_cancel_my_reservation_checks_owner_and_state() {
    let ctx = setup();
    let owner = ctx.seed_borrower(Role::Teacher);
    let other = ctx.seed_borrower(Role::Teacher);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let now = at(2026, 1, 5, 10, 0);

    let reservation =
        borrowing::create_reservation(&ctx.deps, create_reservation_cmd(&owner, &copy, now))
            .await
            .unwrap();

    let err = borrowing::cancel_my_reservation(
        &ctx.deps,
        reservation.reservation_id,
        other.borrower_id,
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BorrowingError::NotReservationOwner));
    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Reserved);

    borrowing::cancel_my_reservation(&ctx.deps, reservation.reservation_id, owner.borrower_id, now)
        .await
        .unwrap();

    let err = borrowing::cancel_my_reservation(
        &ctx.deps,
        reservation.reservation_id,
        owner.borrower_id,
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BorrowingError::ReservationClosed));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_confirm_then_return_round_trip() {
    let ctx = setup();
    let student = ctx.seed_borrower(Role::Student);
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    let reservation = borrowing::create_reservation(
        &ctx.deps,
        create_reservation_cmd(&student, &copy, at(2026, 1, 5, 10, 0)),
    )
    .await
    .unwrap();

    let confirmed_at = at(2026, 1, 6, 9, 0);
    let loan = borrowing::confirm_reservation(
        &ctx.deps,
        ConfirmReservation {
            reservation_id: reservation.reservation_id,
            confirmed_at,
        },
    )
    .await
    .unwrap();

    assert_eq!(loan.reservation_id, Some(reservation.reservation_id));
    assert_eq!(loan.start_date, confirmed_at);
    assert_eq!(loan.due_date, at(2026, 1, 20, 9, 0));
    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Loaned);

    borrowing::return_loan(
        &ctx.deps,
        return_cmd(&loan, ReturnCondition::Lost, at(2026, 1, 7, 9, 0)),
    )
    .await
    .unwrap();

    assert_eq!(copy_state(&ctx, &copy).await, CopyState::Lost);

    let pending = borrowing::list_reservations_for_borrower(&ctx.deps, student.borrower_id)
        .await
        .unwrap();
    assert!(pending.is_empty());

    let err = borrowing::confirm_reservation(
        &ctx.deps,
        ConfirmReservation {
            reservation_id: reservation.reservation_id,
            confirmed_at: at(2026, 1, 8, 9, 0),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BorrowingError::ReservationNotPending));
}

#[tokio::test]
async fn test_expire_reservations_cancels_lapsed_holds() {
    let ctx = setup();
    let first = ctx.seed_borrower(Role::Teacher);
    let second = ctx.seed_borrower(Role::Teacher);
    let lapsed = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let fresh = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    borrowing::create_reservation(
        &ctx.deps,
        create_reservation_cmd(&first, &lapsed, at(2026, 1, 5, 10, 0)),
    )
    .await
    .unwrap();
    borrowing::create_reservation(
        &ctx.deps,
        create_reservation_cmd(&second, &fresh, at(2026, 1, 7, 10, 0)),
    )
    .await
    .unwrap();

    // 最初の予約は 01-07 10:00 に期限切れ
    let expired = borrowing::expire_reservations(&ctx.deps, at(2026, 1, 7, 12, 0))
        .await
        .unwrap();

    assert_eq!(expired, 1);
    assert_eq!(copy_state(&ctx, &lapsed).await, CopyState::Available);
    assert_eq!(copy_state(&ctx, &fresh).await, CopyState::Reserved);

    let pending = borrowing::list_pending_reservations(&ctx.deps).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].copy, fresh.copy);

    let again = borrowing::expire_reservations(&ctx.deps, at(2026, 1, 7, 12, 0))
        .await
        .unwrap();
    assert_eq!(again, 0);
}

// ============================================================================
// 利用者・所蔵品
// ============================================================================

#[tokio::test]
async fn test_register_borrower_validates_course_and_identity() {
    let ctx = setup();

    let student = borrowing::register_borrower(
        &ctx.deps,
        NewBorrower {
            name: "Ana".to_string(),
            national_id: "12345678".to_string(),
            email: "ana@school.example".to_string(),
            role: Role::Student,
            course: Some("2A".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(student.course.as_deref(), Some("2A"));

    let err = borrowing::register_borrower(
        &ctx.deps,
        NewBorrower {
            name: "Ana again".to_string(),
            national_id: "12345678".to_string(),
            email: "other@school.example".to_string(),
            role: Role::Teacher,
            course: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = borrowing::register_borrower(
        &ctx.deps,
        NewBorrower {
            name: "Bruno".to_string(),
            national_id: "87654321".to_string(),
            email: "bruno@school.example".to_string(),
            role: Role::Student,
            course: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BorrowingError::InvalidInput(_)));
}

#[tokio::test]
async fn test_clear_sanction_allows_borrowing_again() {
    let ctx = setup();
    let now = at(2026, 1, 5, 10, 0);
    let teacher = ctx.seed_suspended_borrower(Role::Teacher, at(2026, 1, 10, 0, 0));
    let copy = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    let cleared = borrowing::clear_sanction(&ctx.deps, teacher.borrower_id, now)
        .await
        .unwrap();
    assert!(cleared.suspended_until.is_none());

    borrowing::create_loan(&ctx.deps, create_loan_cmd(&teacher, &copy, now))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_copies_numbers_sequentially() {
    let ctx = setup();
    let title = TitleId::new();
    let now = at(2026, 1, 5, 10, 0);

    let first = borrowing::add_copies(
        &ctx.deps,
        AddCopies {
            title_id: title,
            kind: ItemKind::BookCopy,
            count: 2,
            added_at: now,
        },
    )
    .await
    .unwrap();
    let second = borrowing::add_copies(
        &ctx.deps,
        AddCopies {
            title_id: title,
            kind: ItemKind::BookCopy,
            count: 1,
            added_at: now,
        },
    )
    .await
    .unwrap();

    let numbers: Vec<u32> = first.iter().chain(&second).map(|c| c.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(first.iter().all(|c| c.state == CopyState::Available));

    let err = borrowing::add_copies(
        &ctx.deps,
        AddCopies {
            title_id: title,
            kind: ItemKind::BookCopy,
            count: 0,
            added_at: now,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_override_copy_state_follows_transition_table() {
    let ctx = setup();
    let now = at(2026, 1, 5, 10, 0);
    let book = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let resource = ctx.seed_copy(ItemKind::ResourceInstance, TitleId::new());

    let record = borrowing::override_copy_state(
        &ctx.deps,
        OverrideCopyState {
            copy: resource.copy,
            to: CopyState::Maintenance,
            notes: Some("lamp replacement".to_string()),
        },
        now,
    )
    .await
    .unwrap();
    assert_eq!(record.state, CopyState::Maintenance);
    assert_eq!(record.notes, "lamp replacement");

    let err = borrowing::override_copy_state(
        &ctx.deps,
        OverrideCopyState {
            copy: book.copy,
            to: CopyState::Maintenance,
            notes: None,
        },
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        BorrowingError::InvalidCopyOperation(LedgerError::MaintenanceRequiresResource)
    ));

    let err = borrowing::override_copy_state(
        &ctx.deps,
        OverrideCopyState {
            copy: book.copy,
            to: CopyState::Loaned,
            notes: None,
        },
        now,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(copy_state(&ctx, &book).await, CopyState::Available);
}

#[tokio::test]
async fn test_decommission_rejects_copies_in_use() {
    let ctx = setup();
    let teacher = ctx.seed_borrower(Role::Teacher);
    let loaned = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());
    let idle = ctx.seed_copy(ItemKind::BookCopy, TitleId::new());

    borrowing::create_loan(
        &ctx.deps,
        create_loan_cmd(&teacher, &loaned, at(2026, 1, 5, 10, 0)),
    )
    .await
    .unwrap();

    let err = borrowing::decommission_copy(&ctx.deps, loaned.copy)
        .await
        .unwrap_err();
    assert!(matches!(err, BorrowingError::InvalidCopyOperation(LedgerError::InUse(_))));

    borrowing::decommission_copy(&ctx.deps, idle.copy).await.unwrap();
    assert!(ctx.ledger.get(idle.copy).await.unwrap().is_none());

    let err = borrowing::decommission_copy(&ctx.deps, idle.copy)
        .await
        .unwrap_err();
    assert!(matches!(err, BorrowingError::CopyNotFound));
}
