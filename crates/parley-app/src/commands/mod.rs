//! Subcommand handlers.

mod chat;
mod history;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use parley_ai::{SharedClient, TgiClient};
use parley_common::ParleyError;
use parley_config::toml_loader::default_history_dir;
use parley_config::ConfigStore;
use parley_history::HistoryStore;
use parley_session::ClientTitleGenerator;

use crate::cli::{Args, Command};

/// Everything a command may need, opened once at startup.
pub struct Context {
    pub config: ConfigStore,
    history_dir: PathBuf,
}

impl Context {
    pub fn open(args: &Args) -> Result<Self, ParleyError> {
        let config = match &args.config {
            Some(path) => {
                tracing::info!("Using config override: {}", path.display());
                ConfigStore::open(path)?
            }
            None => ConfigStore::open_default()?,
        };
        let history_dir = match &args.history_dir {
            Some(dir) => dir.clone(),
            None => default_history_dir()?,
        };
        Ok(Self {
            config,
            history_dir,
        })
    }

    /// Client for the configured endpoint.
    pub fn client(&self) -> Result<SharedClient, ParleyError> {
        let client = TgiClient::new(&self.config.current_endpoint())?;
        Ok(SharedClient::new(Arc::new(client)))
    }

    /// History store without title generation, for offline commands.
    pub async fn history(&self) -> Result<HistoryStore, ParleyError> {
        let store = HistoryStore::open(&self.history_dir)
            .await?
            .with_min_save_interval(self.config.snapshot().autosave.save_interval());
        Ok(store)
    }

    /// History store that names new sessions through `client`.
    pub async fn titled_history(&self, client: &SharedClient) -> Result<HistoryStore, ParleyError> {
        let titles = ClientTitleGenerator::new(Arc::new(client.clone()));
        Ok(self.history().await?.with_titles(Arc::new(titles)))
    }

    /// Point the config and `client` at a new endpoint. The old endpoint
    /// stays active if the new address is unusable.
    pub fn switch_endpoint(
        &self,
        client: &SharedClient,
        name_or_url: &str,
    ) -> Result<String, ParleyError> {
        let address = self.config.resolve_endpoint(name_or_url);
        let new_client = self.config.update_endpoint(&address, TgiClient::new)?;
        client.replace(Arc::new(new_client));
        Ok(address)
    }
}

pub async fn run(args: Args) -> Result<(), ParleyError> {
    let ctx = Context::open(&args)?;
    match args.command.unwrap_or(Command::Chat { resume: None }) {
        Command::Chat { resume } => chat::run(&ctx, resume).await,
        Command::List => history::list(&ctx).await,
        Command::Show { id } => history::show(&ctx, &id).await,
        Command::Rename { id, title } => history::rename(&ctx, &id, &title).await,
        Command::Delete { id } => history::delete(&ctx, &id).await,
        Command::Endpoint(cmd) => settings::endpoint(&ctx, cmd),
        Command::Set { param, value } => settings::set(&ctx, param, value),
        Command::Config => settings::show_config(&ctx),
        Command::System { message } => settings::system(&ctx, message.as_deref()),
        Command::Ping { message } => chat::ping(&ctx, message.as_deref()).await,
    }
}
