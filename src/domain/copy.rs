use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CopyId, CopyRef, ItemKind, LedgerError, TitleId};

/// 所蔵品（複本・個体）の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyState {
    /// 貸出可能
    Available,
    /// 貸出中
    Loaned,
    /// 予約で確保中
    Reserved,
    /// 破損
    Damaged,
    /// 紛失
    Lost,
    /// 整備中（備品のみ）
    Maintenance,
}

impl CopyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyState::Available => "available",
            CopyState::Loaned => "loaned",
            CopyState::Reserved => "reserved",
            CopyState::Damaged => "damaged",
            CopyState::Lost => "lost",
            CopyState::Maintenance => "maintenance",
        }
    }
}

impl std::str::FromStr for CopyState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(CopyState::Available),
            "loaned" => Ok(CopyState::Loaned),
            "reserved" => Ok(CopyState::Reserved),
            "damaged" => Ok(CopyState::Damaged),
            "lost" => Ok(CopyState::Lost),
            "maintenance" => Ok(CopyState::Maintenance),
            _ => Err(format!("Invalid copy state: {}", s)),
        }
    }
}

/// 状態遷移表
///
/// この表にない遷移はすべて拒否される。
const TRANSITIONS: &[(CopyState, CopyState)] = &[
    (CopyState::Available, CopyState::Loaned),
    (CopyState::Available, CopyState::Reserved),
    (CopyState::Available, CopyState::Maintenance),
    (CopyState::Reserved, CopyState::Loaned),
    (CopyState::Reserved, CopyState::Available),
    (CopyState::Loaned, CopyState::Available),
    (CopyState::Loaned, CopyState::Damaged),
    (CopyState::Loaned, CopyState::Lost),
    (CopyState::Damaged, CopyState::Available),
    (CopyState::Damaged, CopyState::Maintenance),
    (CopyState::Lost, CopyState::Available),
    (CopyState::Lost, CopyState::Maintenance),
    (CopyState::Maintenance, CopyState::Available),
];

/// 遷移表に含まれる遷移か
pub fn is_allowed_transition(from: CopyState, to: CopyState) -> bool {
    TRANSITIONS.contains(&(from, to))
}

/// 返却時に選択できる最終状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Available,
    Damaged,
    Lost,
}

impl From<ReturnCondition> for CopyState {
    fn from(condition: ReturnCondition) -> Self {
        match condition {
            ReturnCondition::Available => CopyState::Available,
            ReturnCondition::Damaged => CopyState::Damaged,
            ReturnCondition::Lost => CopyState::Lost,
        }
    }
}

impl std::str::FromStr for ReturnCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ReturnCondition::Available),
            "damaged" => Ok(ReturnCondition::Damaged),
            "lost" => Ok(ReturnCondition::Lost),
            _ => Err(format!("Invalid final state: {}", s)),
        }
    }
}

/// 所蔵品 - 1冊の複本、または1台の備品個体
///
/// 親タイトルにちょうど1つ属する。
/// 有効な貸出・予約との排他は状態で表現する（別途のロックは持たない）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRecord {
    pub copy: CopyRef,
    pub title_id: TitleId,
    /// タイトル内の連番（複本番号・管理番号）
    pub number: u32,
    pub state: CopyState,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

impl CopyRecord {
    /// 貸出・予約可能か
    pub fn is_borrowable(&self) -> bool {
        self.state == CopyState::Available
    }
}

/// 台帳への状態変更指示
///
/// 永続化層は `from` を期待値とする条件付き更新（compare-and-set）で適用する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTransition {
    pub copy: CopyRef,
    pub from: CopyState,
    pub to: CopyState,
}

/// 純粋関数：状態遷移を検証する
///
/// ビジネスルール：
/// - 遷移表にない遷移は不可
/// - 整備中は備品の個体のみ
pub fn plan_transition(
    copy: CopyRef,
    from: CopyState,
    to: CopyState,
) -> Result<CopyTransition, LedgerError> {
    if to == CopyState::Maintenance && copy.kind() != ItemKind::ResourceInstance {
        return Err(LedgerError::MaintenanceRequiresResource);
    }

    if !is_allowed_transition(from, to) {
        return Err(LedgerError::InvalidTransition { from, to });
    }

    Ok(CopyTransition { copy, from, to })
}

/// 純粋関数：所蔵品を除籍できるか検証する
///
/// 貸出中・予約中の所蔵品は除籍できない。
pub fn check_decommission(copy: &CopyRecord) -> Result<(), LedgerError> {
    match copy.state {
        CopyState::Loaned | CopyState::Reserved => Err(LedgerError::InUse(copy.state)),
        _ => Ok(()),
    }
}

/// 純粋関数：タイトルに所蔵品を追加する
///
/// 連番は既存の最大番号の次から振る。
pub fn new_copies(
    title_id: TitleId,
    kind: ItemKind,
    highest_existing_number: Option<u32>,
    count: u32,
    created_at: DateTime<Utc>,
) -> Vec<CopyRecord> {
    let start = highest_existing_number.map_or(1, |n| n + 1);
    (start..start + count)
        .map(|number| CopyRecord {
            copy: CopyRef::new(kind, CopyId::new()),
            title_id,
            number,
            state: CopyState::Available,
            notes: String::new(),
            updated_at: created_at,
        })
        .collect()
}
