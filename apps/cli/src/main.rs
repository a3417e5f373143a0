//! Command-line uploader.
//!
//! Submits one or more files to a drive account and prints task events as
//! they arrive. There is no interactive sign-in here: when a credential
//! cannot be renewed silently, the failure is printed and the exit code is
//! non-zero.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

use nimbus_api::HttpDriveClient;
use nimbus_credentials::{
    CredentialBroker, CredentialStore, IdentityProvider, ProviderError, ProviderFuture,
    default_store_path,
};
use nimbus_supervisor::{TaskEvent, TaskState, TransferSupervisor, UploadSpec};
use nimbus_transfer::{EngineConfig, TransferEngine};

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

const SCOPES: [&str; 2] = ["Files.ReadWrite.All", "User.Read"];

/// The CLI cannot run an interactive consent flow, so silent renewal
/// always reports that the user must sign in through the main app.
struct NoInteractionProvider;

impl IdentityProvider for NoInteractionProvider {
    fn acquire_silent(&self, _account_id: &str, _scopes: &[String]) -> ProviderFuture<'_, String> {
        Box::pin(async move { Err::<String, _>(ProviderError::ConsentRequired) })
    }
}

struct Args {
    account_id: Option<String>,
    parent_id: String,
    content_type: String,
    files: Vec<PathBuf>,
}

fn usage() -> &'static str {
    "usage: nimbus [--account <id>] [--parent <item-id>] [--content-type <mime>] <file>..."
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut args = args.into_iter();
    let _ = args.next();
    let mut parsed = Args {
        account_id: None,
        parent_id: "root".to_string(),
        content_type: "application/octet-stream".to_string(),
        files: Vec::new(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--account" => {
                parsed.account_id = Some(args.next().context("--account needs a value")?);
            }
            "--parent" => {
                parsed.parent_id = args.next().context("--parent needs a value")?;
            }
            "--content-type" => {
                parsed.content_type = args.next().context("--content-type needs a value")?;
            }
            "--help" | "-h" => bail!("{}", usage()),
            other if other.starts_with("--") => bail!("unknown flag {other}\n{}", usage()),
            other => parsed.files.push(PathBuf::from(other)),
        }
    }
    if parsed.files.is_empty() {
        bail!("no files given\n{}", usage());
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args(std::env::args())?;

    let store_path = default_store_path().context("no config directory on this platform")?;
    let store = Arc::new(CredentialStore::new(store_path).context("failed to load account store")?);

    let account_id = match args.account_id {
        Some(id) => id,
        None => store
            .primary_id()
            .context("no --account given and no primary account configured")?,
    };
    if store.get(&account_id).is_none() {
        bail!("unknown account {account_id}; sign in through the main app first");
    }

    let broker = Arc::new(CredentialBroker::new(
        Arc::clone(&store),
        Arc::new(NoInteractionProvider),
        SCOPES.iter().map(|s| s.to_string()).collect(),
    ));
    let client = Arc::new(HttpDriveClient::new(GRAPH_BASE_URL)?);
    let engine = Arc::new(TransferEngine::new(client, broker, EngineConfig::default()));

    let mut supervisor = TransferSupervisor::new(engine);
    let mut events = supervisor
        .take_events()
        .context("event stream already taken")?;

    let total = args.files.len();
    for path in args.files {
        let file_name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?
            .to_string_lossy()
            .into_owned();
        supervisor.submit(UploadSpec {
            account_id: account_id.clone(),
            parent_id: args.parent_id.clone(),
            file_name,
            content_type: args.content_type.clone(),
            path,
        });
    }

    let mut failed = 0usize;
    let mut finished = 0usize;
    while finished < total {
        let Some(event) = events.recv().await else {
            break;
        };
        match event {
            TaskEvent::Progress { task_id, percent } => {
                println!("{task_id}  {percent:>3}%");
            }
            TaskEvent::Terminal {
                task_id,
                state,
                detail,
                ..
            } => {
                finished += 1;
                match state {
                    TaskState::Succeeded => println!("{task_id}  done"),
                    TaskState::Cancelled => println!("{task_id}  cancelled"),
                    _ => {
                        failed += 1;
                        let detail = detail.unwrap_or_else(|| "unknown error".to_string());
                        eprintln!("{task_id}  failed: {detail}");
                    }
                }
            }
        }
    }
    supervisor.await_idle().await;

    if failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
