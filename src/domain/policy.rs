use serde::Serialize;

use super::{CopyRef, ItemKind, Role, TitleId};

/// 利用者が現在保持している所蔵品（有効な貸出 + 保留中の予約）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutstandingItem {
    pub copy: CopyRef,
    /// 所蔵品の親タイトル
    pub title_id: TitleId,
}

/// 新たに貸出・予約しようとしている所蔵品
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub copy: CopyRef,
    pub title_id: TitleId,
}

/// 貸出方針の違反
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    /// 生徒は書籍のみ
    StudentBooksOnly,
    /// 生徒は合計1点まで
    StudentLimitReached,
    /// 職員は書籍1冊まで
    StaffBookLimitReached,
    /// 職員は備品1点まで
    StaffResourceLimitReached,
    /// 教員は同一タイトルを重複して保持できない
    TeacherDuplicateTitle,
}

impl PolicyViolation {
    /// 利用者にそのまま表示する理由
    pub fn reason(&self) -> &'static str {
        match self {
            PolicyViolation::StudentBooksOnly => "Students may only borrow books",
            PolicyViolation::StudentLimitReached => {
                "Students may hold at most 1 item (loans and reservations combined)"
            }
            PolicyViolation::StaffBookLimitReached => "Staff may hold at most 1 book",
            PolicyViolation::StaffResourceLimitReached => "Staff may hold at most 1 resource",
            PolicyViolation::TeacherDuplicateTitle => {
                "Teacher already holds a copy of this title on loan or reservation"
            }
        }
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// 評価結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// 役割ごとの貸出ルール
pub type PolicyRule = fn(&[OutstandingItem], &Candidate) -> Result<(), PolicyViolation>;

/// 役割 → ルールの戦略表
///
/// 表にない役割（管理者・来館者）はこの評価の対象外。
/// 来館者の貸出禁止は上流のアクセス制御が担う。
const STRATEGIES: &[(Role, PolicyRule)] = &[
    (Role::Student, student_rule),
    (Role::Staff, staff_rule),
    (Role::Teacher, teacher_rule),
];

/// 生徒：書籍のみ、貸出と予約の合計1点まで
fn student_rule(outstanding: &[OutstandingItem], candidate: &Candidate) -> Result<(), PolicyViolation> {
    if candidate.copy.kind() != ItemKind::BookCopy {
        return Err(PolicyViolation::StudentBooksOnly);
    }
    if !outstanding.is_empty() {
        return Err(PolicyViolation::StudentLimitReached);
    }
    Ok(())
}

/// 職員：書籍1冊と備品1点をそれぞれ上限とする
fn staff_rule(outstanding: &[OutstandingItem], candidate: &Candidate) -> Result<(), PolicyViolation> {
    let kind = candidate.copy.kind();
    let holds_same_kind = outstanding.iter().any(|item| item.copy.kind() == kind);
    if !holds_same_kind {
        return Ok(());
    }
    match kind {
        ItemKind::BookCopy => Err(PolicyViolation::StaffBookLimitReached),
        ItemKind::ResourceInstance => Err(PolicyViolation::StaffResourceLimitReached),
    }
}

/// 教員：数の上限なし、ただし同一タイトルの重複保持は不可
fn teacher_rule(outstanding: &[OutstandingItem], candidate: &Candidate) -> Result<(), PolicyViolation> {
    if outstanding
        .iter()
        .any(|item| item.title_id == candidate.title_id)
    {
        return Err(PolicyViolation::TeacherDuplicateTitle);
    }
    Ok(())
}

fn unrestricted(_: &[OutstandingItem], _: &Candidate) -> Result<(), PolicyViolation> {
    Ok(())
}

/// 役割に対応するルールを引く
pub fn rule_for(role: Role) -> PolicyRule {
    STRATEGIES
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, rule)| *rule)
        .unwrap_or(unrestricted as PolicyRule)
}

/// 純粋関数：貸出方針を評価する
///
/// 所蔵品の状態を変更する前に必ず呼び出すこと（失敗時は副作用なし）。
pub fn check(
    role: Role,
    outstanding: &[OutstandingItem],
    candidate: &Candidate,
) -> Result<(), PolicyViolation> {
    rule_for(role)(outstanding, candidate)
}

/// 純粋関数：貸出方針を評価し、可否と理由を返す
pub fn evaluate(role: Role, outstanding: &[OutstandingItem], candidate: &Candidate) -> PolicyDecision {
    match check(role, outstanding, candidate) {
        Ok(()) => PolicyDecision {
            allowed: true,
            reason: None,
        },
        Err(violation) => PolicyDecision {
            allowed: false,
            reason: Some(violation.reason().to_string()),
        },
    }
}
