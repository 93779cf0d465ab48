use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use syncstore::{StoreConfig, StoreIdentity, SyncResponse, SyncResponseFileStore, SyncResponseStore};
use tracing::info;

#[derive(Parser)]
#[command(name = "syncstore")]
#[command(about = "Inspect and maintain persisted sync responses")]
struct Cli {
    /// Storage root (overrides config file and SYNCSTORE_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON store config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print where a user's snapshot lives
    Path {
        #[arg(short, long)]
        user: String,
    },
    /// Print a user's snapshot
    Show {
        #[arg(short, long)]
        user: String,
    },
    /// Shallow-merge a JSON object file into a user's snapshot
    Merge {
        #[arg(short, long)]
        user: String,
        file: PathBuf,
    },
    /// Delete a user's snapshot
    Delete {
        #[arg(short, long)]
        user: String,
    },
}

impl Command {
    fn user(&self) -> &str {
        match self {
            Command::Path { user }
            | Command::Show { user }
            | Command::Merge { user, .. }
            | Command::Delete { user } => user.as_str(),
        }
    }
}

async fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = Some(root.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn execute(config: StoreConfig, command: &Command) -> anyhow::Result<()> {
    let identity = StoreIdentity::new(command.user())?;

    // resolving the path must not touch the disk
    if let Command::Path { .. } = command {
        println!("{}", config.snapshot_path(&identity).display());
        return Ok(());
    }

    let store = SyncResponseFileStore::new(config);
    store.open(identity.clone());

    match command {
        Command::Path { .. } => {}
        Command::Show { .. } => match store.read().await {
            Some(snapshot) => println!("{}", snapshot.to_json_string(true)?),
            None => info!("No snapshot stored for {}", identity),
        },
        Command::Merge { file, .. } => {
            let content = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {:?}", file))?;
            let partial = SyncResponse::from_json_str(&content)
                .with_context(|| format!("{:?} does not hold a JSON object", file))?;
            store.update(Some(partial)).wait().await;
            info!("Merged {:?} into snapshot for {}", file, identity);
        }
        Command::Delete { .. } => {
            store.delete_data().wait().await;
            info!("Deleted snapshot for {}", identity);
        }
    }

    store.flush().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syncstore=info,warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config = load_config(&cli).await?;
    execute(config, &cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_path_does_not_create_directories() {
        let dir = tempdir().unwrap();
        let command = Command::Path {
            user: "@alice:example.org".to_string(),
        };

        execute(StoreConfig::with_root(dir.path()), &command).await.unwrap();
        assert!(!dir.path().join("SyncResponse").exists());
    }

    #[tokio::test]
    async fn test_merge_then_delete() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("partial.json");
        std::fs::write(&file, r#"{"next_batch": "s1"}"#).unwrap();
        let config = StoreConfig::with_root(dir.path().join("cache"));
        let user = "alice".to_string();

        execute(config.clone(), &Command::Merge { user: user.clone(), file }).await.unwrap();
        let snapshot = config.snapshot_path(&StoreIdentity::new("alice").unwrap());
        assert!(snapshot.exists());

        execute(config, &Command::Delete { user }).await.unwrap();
        assert!(!snapshot.exists());
    }
}
