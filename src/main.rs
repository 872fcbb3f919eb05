use dotenvy::dotenv;
use medalkeeper::bot::{self, Data};
use medalkeeper::config::{self, Settings};
use medalkeeper::errors::{Error, Result};
use medalkeeper::games::SessionRegistry;
use medalkeeper::ledger::Ledger;
use medalkeeper::permissions::PermissionRegistry;
use medalkeeper::responses::ResponseCatalog;
use medalkeeper::store::DataStore;
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = Arc::new(config::load_app_configuration()?);
    info!("Successfully processed application configuration.");

    // 4. Construct the service stack over the data directory
    let store = Arc::new(
        DataStore::new(&app_config.data_dir)
            .inspect(|_| info!("Data store initialized successfully."))
            .inspect_err(|e| error!("Failed to initialize data store: {e}"))?,
    );
    let settings = Arc::new(Settings::load(&store.config_path("bot_settings.json")));
    let ledger = Ledger::new(Arc::clone(&store), Arc::clone(&settings));
    let permissions = Arc::new(PermissionRegistry::load(
        &store.config_path("guild_permissions.json"),
        app_config.owner_guild_id,
    ));
    let responses = Arc::new(ResponseCatalog::new(store.responses_dir().to_path_buf()));
    let sessions = Arc::new(SessionRegistry::new());

    // 5. Run the bot. The token is read here, directly before use.
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(
        token,
        Data {
            app_config,
            settings,
            ledger,
            permissions,
            responses,
            sessions,
        },
    )
    .await
    .map_err(Error::from)?;

    Ok(())
}
