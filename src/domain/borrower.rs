use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BorrowerError, BorrowerId, Role};

/// 利用者
///
/// 貸出コンテキストが必要とする情報のみを持つ。
/// 認証情報やプロフィール編集は別コンテキストの責務。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: BorrowerId,
    pub name: String,
    /// 国民ID（一意）
    pub national_id: String,
    /// メールアドレス（一意）
    pub email: String,
    pub role: Role,
    /// 学級（生徒のみ）
    pub course: Option<String>,
    /// 貸出停止の期限
    pub suspended_until: Option<DateTime<Utc>>,
}

/// 利用者登録の入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBorrower {
    pub name: String,
    pub national_id: String,
    pub email: String,
    pub role: Role,
    pub course: Option<String>,
}

/// 純粋関数：利用者を登録する
///
/// ビジネスルール：
/// - 学級は生徒の場合のみ、かつ必須
/// - 登録時点では貸出停止なし
pub fn register_borrower(input: NewBorrower) -> Result<Borrower, BorrowerError> {
    let course = input
        .course
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    match (input.role, &course) {
        (Role::Student, None) => return Err(BorrowerError::CourseRequired),
        (Role::Student, Some(_)) | (_, None) => {}
        (_, Some(_)) => return Err(BorrowerError::CourseNotAllowed),
    }

    Ok(Borrower {
        borrower_id: BorrowerId::new(),
        name: input.name,
        national_id: input.national_id,
        email: input.email,
        role: input.role,
        course,
        suspended_until: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(role: Role, course: Option<&str>) -> NewBorrower {
        NewBorrower {
            name: "Ana Rojas".to_string(),
            national_id: "12.345.678-9".to_string(),
            email: "ana@school.test".to_string(),
            role,
            course: course.map(str::to_string),
        }
    }

    #[test]
    fn test_register_student_requires_course() {
        assert_eq!(
            register_borrower(input(Role::Student, None)),
            Err(BorrowerError::CourseRequired)
        );
        assert_eq!(
            register_borrower(input(Role::Student, Some("  "))),
            Err(BorrowerError::CourseRequired)
        );

        let student = register_borrower(input(Role::Student, Some("3B"))).unwrap();
        assert_eq!(student.course.as_deref(), Some("3B"));
        assert!(student.suspended_until.is_none());
    }

    #[test]
    fn test_register_non_student_rejects_course() {
        assert_eq!(
            register_borrower(input(Role::Teacher, Some("3B"))),
            Err(BorrowerError::CourseNotAllowed)
        );

        let staff = register_borrower(input(Role::Staff, None)).unwrap();
        assert_eq!(staff.role, Role::Staff);
        assert!(staff.course.is_none());
    }
}
