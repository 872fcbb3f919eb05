//! Shared fixtures for unit tests: every test gets its own data directory and
//! freshly constructed services, so nothing leaks between tests.

use crate::config::Settings;
use crate::ledger::Ledger;
use crate::store::DataStore;
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

pub const GUILD: u64 = 990_011;
pub const USER: u64 = 1_111;
pub const USER_NAME: &str = "Tester";
pub const TARGET: u64 = 2_222;
pub const TARGET_NAME: &str = "Mark";

#[allow(dead_code)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub struct TestEnv {
    // Held so the data directory outlives the services using it.
    #[allow(dead_code)]
    pub dir: TempDir,
    pub store: Arc<DataStore>,
    pub settings: Arc<Settings>,
    pub ledger: Ledger,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp data dir");
        let store = Arc::new(DataStore::new(dir.path()).expect("data store"));
        let settings = Arc::new(Settings::load(&store.config_path("bot_settings.json")));
        let ledger = Ledger::new(Arc::clone(&store), Arc::clone(&settings));
        TestEnv {
            dir,
            store,
            settings,
            ledger,
        }
    }
}
