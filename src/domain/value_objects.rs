use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UUIDを内包するID値オブジェクトを定義する
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_id!(
    /// 貸出ID - 貸出集約のID
    LoanId
);

define_id!(
    /// 予約ID - 予約集約のID
    ReservationId
);

define_id!(
    /// 利用者ID - 利用者管理コンテキストへの参照
    BorrowerId
);

define_id!(
    /// 所蔵品ID - 書籍の複本、または備品の個体
    CopyId
);

define_id!(
    /// タイトルID - 複本・個体の親（書籍または備品）
    TitleId
);

/// 所蔵品の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// 書籍の複本
    BookCopy,
    /// 備品の個体
    ResourceInstance,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::BookCopy => "book_copy",
            ItemKind::ResourceInstance => "resource_instance",
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book_copy" => Ok(ItemKind::BookCopy),
            "resource_instance" => Ok(ItemKind::ResourceInstance),
            _ => Err(format!("Invalid item kind: {}", s)),
        }
    }
}

/// 所蔵品への参照（タグ付き共用体）
///
/// 貸出・予約は書籍の複本か備品の個体のいずれかを指す。
/// 2つのnullable外部キーではなく、種別ごとのバリアントで表現する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CopyRef {
    BookCopy(CopyId),
    ResourceInstance(CopyId),
}

impl CopyRef {
    pub fn new(kind: ItemKind, id: CopyId) -> Self {
        match kind {
            ItemKind::BookCopy => CopyRef::BookCopy(id),
            ItemKind::ResourceInstance => CopyRef::ResourceInstance(id),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            CopyRef::BookCopy(_) => ItemKind::BookCopy,
            CopyRef::ResourceInstance(_) => ItemKind::ResourceInstance,
        }
    }

    pub fn id(&self) -> CopyId {
        match self {
            CopyRef::BookCopy(id) | CopyRef::ResourceInstance(id) => *id,
        }
    }
}

/// 利用者の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Staff,
    Visitor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Staff => "staff",
            Role::Visitor => "visitor",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            "visitor" => Ok(Role::Visitor),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// 延長日数エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalDaysError {
    /// 1以上の整数ではない
    NotPositive(i64),
    /// 上限を超えている
    TooLarge(i64),
}

/// 1回の延長で指定できる営業日数の上限
pub const MAX_RENEWAL_DAYS: u32 = 60;

/// 延長日数（営業日）
///
/// 不変条件：1以上 `MAX_RENEWAL_DAYS` 以下。
/// 0や負数、日付計算が破綻する極端な延長を型で排除する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalDays(u32);

impl RenewalDays {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for RenewalDays {
    type Error = RenewalDaysError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(RenewalDaysError::NotPositive(value));
        }
        match u32::try_from(value) {
            Ok(days) if days <= MAX_RENEWAL_DAYS => Ok(Self(days)),
            _ => Err(RenewalDaysError::TooLarge(value)),
        }
    }
}

/// 貸出条件
///
/// 返却期限と予約保持期間の計算に使うパラメータ。
/// 時刻判定（17時締め）と営業日計算は図書館の現地時刻で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingTerms {
    /// 図書館の現地時刻（UTCからの固定オフセット）
    pub utc_offset: FixedOffset,
    /// 書籍の貸出期間（営業日）
    pub book_loan_business_days: u32,
    /// 備品の返却締め時刻（時）
    pub resource_due_hour: u32,
    /// 予約の保持期間（営業日）
    pub reservation_hold_business_days: u32,
}

impl Default for LendingTerms {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            book_loan_business_days: 10,
            resource_due_hour: 17,
            reservation_hold_business_days: 2,
        }
    }
}
