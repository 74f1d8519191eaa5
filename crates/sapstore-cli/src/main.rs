use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use sapstore::{
    ApiHubSettings, BackendSystem, BackendSystemKey, GetAllOptions, Store, StoreConfig, StoreContext,
    StoreError, SystemPatch, SystemType, TelemetrySetting, WriteOptions,
};

/// sapstore - saved SAP backend systems and settings
#[derive(Parser, Debug)]
#[command(name = "sapstore")]
#[command(about = "Manage saved SAP backend systems, with credentials kept in the OS secret manager")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List saved backend systems
    List {
        /// Include credentials in the output
        #[arg(long)]
        sensitive: bool,

        /// Only list systems of this type (OnPrem, AbapCloud, Generic)
        #[arg(long)]
        system_type: Option<SystemType>,
    },

    /// Show one backend system
    Show {
        #[command(flatten)]
        key: KeyArgs,

        /// Include credentials in the output
        #[arg(long)]
        sensitive: bool,
    },

    /// Save a new backend system
    Add {
        #[arg(long)]
        name: String,

        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        password: Option<String>,

        /// System type (OnPrem, AbapCloud, Generic)
        #[arg(long)]
        system_type: Option<SystemType>,

        /// Overwrite a system saved under the same URL and client
        #[arg(long)]
        force: bool,
    },

    /// Change fields of a saved backend system
    Update {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        password: Option<String>,
    },

    /// Remove a saved backend system and its credentials
    Remove {
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Show or change the telemetry setting
    Telemetry {
        state: Option<Toggle>,
    },

    /// Show or change the SAP API Business Hub key
    ApiHub {
        /// Store this API key
        #[arg(long, conflicts_with = "clear")]
        set: Option<String>,

        /// Remove the stored API key
        #[arg(long)]
        clear: bool,
    },
}

/// URL and client identifying a backend system
#[derive(clap::Args, Debug)]
struct KeyArgs {
    /// Backend system URL
    #[arg(long)]
    url: String,

    /// SAP client
    #[arg(long)]
    client: Option<String>,
}

impl KeyArgs {
    fn key(&self) -> BackendSystemKey {
        BackendSystemKey::new(self.url.clone(), self.client.clone())
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("sapstore={}", level).parse()?)
                .add_directive(format!("sapstore_secrets={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = StoreConfig::load_default()
        .resolve()
        .context("Failed to resolve store configuration")?;
    let store = Store::new(StoreContext::from_config(&config));

    if let Err(e) = run(&store, cli.command).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(store: &Store, command: Commands) -> Result<()> {
    match command {
        Commands::List {
            sensitive,
            system_type,
        } => {
            let systems = store
                .systems()
                .get_all(GetAllOptions {
                    include_sensitive_data: sensitive,
                    system_type,
                })
                .await
                .context("Failed to list backend systems")?;
            print_json(&systems)
        }

        Commands::Show { key, sensitive } => {
            let key = key.key();
            let system = store
                .systems()
                .provider()
                .read(&key, sensitive)
                .await
                .with_context(|| format!("Failed to read backend system {}", key))?
                .with_context(|| format!("No backend system saved for {}", key))?;
            print_json(&system)
        }

        Commands::Add {
            name,
            key,
            username,
            password,
            system_type,
            force,
        } => {
            let system = BackendSystem {
                name,
                url: key.url,
                client: key.client,
                system_type,
                username,
                password,
                ..Default::default()
            };

            match store.systems().write(&system, WriteOptions { force }).await {
                Ok(saved) => {
                    println!("Saved backend system {}", saved.key());
                    Ok(())
                }
                Err(StoreError::AlreadyExists(id)) => {
                    anyhow::bail!("A backend system is already saved for {}. Use --force to replace it", id)
                }
                Err(e) => Err(e).context("Failed to save backend system"),
            }
        }

        Commands::Update {
            key,
            name,
            username,
            password,
        } => {
            let key = key.key();
            let patch = SystemPatch {
                name,
                username,
                password,
                ..Default::default()
            };
            store
                .systems()
                .partial_update(&key, patch)
                .await
                .with_context(|| format!("Failed to update backend system {}", key))?;
            println!("Updated backend system {}", key);
            Ok(())
        }

        Commands::Remove { key } => {
            let key = key.key();
            let deleted = store
                .systems()
                .delete_by_key(&key)
                .await
                .with_context(|| format!("Failed to remove backend system {}", key))?;
            if deleted {
                println!("Removed backend system {}", key);
            } else {
                println!("No backend system saved for {}", key);
            }
            Ok(())
        }

        Commands::Telemetry { state } => {
            let telemetry = store.telemetry();
            if let Some(state) = state {
                let enabled = matches!(state, Toggle::On);
                telemetry
                    .write(&TelemetrySetting::new(enabled))
                    .await
                    .context("Failed to save telemetry setting")?;
            }

            let setting = telemetry
                .read()
                .await
                .context("Failed to read telemetry setting")?;
            print_json(&json!({
                "enableTelemetry": setting.map(|s| s.enable_telemetry),
            }))
        }

        Commands::ApiHub { set, clear } => {
            let api_hub = store.api_hub();
            if clear {
                api_hub.delete().await.context("Failed to remove API Hub key")?;
            } else if let Some(api_key) = set {
                api_hub
                    .write(&ApiHubSettings::new(api_key))
                    .await
                    .context("Failed to save API Hub key")?;
            }

            let configured = api_hub
                .read()
                .await
                .context("Failed to read API Hub settings")?
                .is_some_and(|settings| !settings.api_key.is_empty());
            print_json(&json!({ "apiKeyConfigured": configured }))
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to format output")?;
    println!("{}", output);
    Ok(())
}
