//! 貸出管理サービスの設定

use chrono::FixedOffset;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::domain::LendingTerms;

/// HTTPサーバーの設定
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// データベース接続の設定
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// ポートを実装するアダプターの種類
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

/// 貸出条件の設定
///
/// 起動時に `to_terms` でドメインの `LendingTerms` に変換する。
#[derive(Debug, Deserialize, Clone)]
pub struct LendingConfig {
    /// 図書館の現地時刻（UTCからの分）
    pub utc_offset_minutes: i32,
    pub book_loan_business_days: u32,
    pub resource_due_hour: u32,
    pub reservation_hold_business_days: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReservationsConfig {
    /// 未設定の場合、期限切れ処理は明示的な呼び出し時のみ
    pub expiry_sweep_interval_secs: Option<u64>,
}

/// アプリケーション全体の設定
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub lending: LendingConfig,
    #[serde(default)]
    pub reservations: ReservationsConfig,
}

impl AppConfig {
    /// 設定を読み込む
    ///
    /// 優先順位（後勝ち）：既定値 → config/default → config/{RUN_MODE} → 環境変数 → DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let defaults = Self::default();

        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default("storage.backend", "memory")?
            .set_default("logging.level", defaults.logging.level)?
            .set_default(
                "lending.utc_offset_minutes",
                defaults.lending.utc_offset_minutes,
            )?
            .set_default(
                "lending.book_loan_business_days",
                defaults.lending.book_loan_business_days,
            )?
            .set_default(
                "lending.resource_due_hour",
                defaults.lending.resource_due_hour,
            )?
            .set_default(
                "lending.reservation_hold_business_days",
                defaults.lending.reservation_hold_business_days,
            )?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // LIBRARY_DATABASE__MAX_CONNECTIONS=20
            .add_source(
                Environment::with_prefix("LIBRARY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// HTTPリスナーの待ち受けアドレス
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl LendingConfig {
    /// ドメインの貸出条件に変換する
    ///
    /// オフセットが±24時間の範囲外、または締め時刻が0〜23時以外ならエラー。
    pub fn to_terms(&self) -> Result<LendingTerms, ConfigError> {
        let utc_offset = FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Message(format!(
                "lending.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })?;

        if self.resource_due_hour > 23 {
            return Err(ConfigError::Message(format!(
                "lending.resource_due_hour must be between 0 and 23: {}",
                self.resource_due_hour
            )));
        }

        Ok(LendingTerms {
            utc_offset,
            book_loan_business_days: self.book_loan_business_days,
            resource_due_hour: self.resource_due_hour,
            reservation_hold_business_days: self.reservation_hold_business_days,
        })
    }
}

impl ReservationsConfig {
    /// 定期的な期限切れ処理の間隔（0は無効）
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.expiry_sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/library".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "school_library_lending=debug,tower_http=debug".to_string(),
        }
    }
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            book_loan_business_days: 10,
            resource_due_hour: 17,
            reservation_hold_business_days: 2,
        }
    }
}
