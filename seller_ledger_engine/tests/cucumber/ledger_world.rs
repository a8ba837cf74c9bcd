use cucumber::World;
use seller_ledger_engine::{
    events::EventProducers,
    fees::StripeFeeBreakdown,
    webhook_objects::WebhookOutcome,
    LedgerApi,
    LedgerConfig,
    LedgerError,
    LedgerDatabase,
    SqliteDatabase,
    WebhookApi,
};

use crate::support::prepare_env::prepare_test_env;

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LedgerSystem>,
    pub last_breakdown: Option<StripeFeeBreakdown>,
    pub last_settled: Option<usize>,
    pub last_webhook: Option<Result<WebhookOutcome, LedgerError>>,
}

#[derive(Debug)]
pub struct LedgerSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub ledger: LedgerApi<SqliteDatabase>,
    pub webhooks: WebhookApi<SqliteDatabase>,
}

impl LedgerWorld {
    pub fn system(&self) -> &LedgerSystem {
        self.system.as_ref().expect("Ledger system not initialised")
    }

    pub fn ledger(&self) -> &LedgerApi<SqliteDatabase> {
        &self.system().ledger
    }

    pub fn webhooks(&self) -> &WebhookApi<SqliteDatabase> {
        &self.system().webhooks
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }
}

impl LedgerSystem {
    pub async fn new() -> Self {
        let db = prepare_test_env().await;
        let config = LedgerConfig::default();
        let ledger = LedgerApi::new(db.clone(), config.clone(), EventProducers::default());
        let webhooks = WebhookApi::new(db.clone(), config, EventProducers::default());
        Self { db_path: db.url().to_string(), db, ledger, webhooks }
    }
}
