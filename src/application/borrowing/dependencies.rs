use crate::domain::LendingTerms;
use crate::ports::*;
use std::sync::Arc;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、各サービス関数に引数として渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub borrower_repository: Arc<dyn BorrowerRepository>,
    pub copy_ledger: Arc<dyn CopyLedger>,
    pub loan_repository: Arc<dyn LoanRepository>,
    pub reservation_repository: Arc<dyn ReservationRepository>,
    pub event_store: Arc<dyn EventStore>,
    /// 返却期限・予約保持期間の計算条件
    pub terms: LendingTerms,
}
