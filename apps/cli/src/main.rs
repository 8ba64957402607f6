use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use vdsl_core::session::{SessionConfig, VdslSession};

#[derive(Parser, Debug)]
#[command(author, version, about = "Query VDSL line statistics from a DrayTek Vigor modem", long_about = None)]
struct Args {
    /// IP address of the modem to query
    ip: String,

    /// Username with permissions to query VDSL stats [default: admin]
    #[arg(short, long)]
    username: Option<String>,

    /// Password [default: admin]
    #[arg(short, long)]
    password: Option<String>,

    /// Telnet port
    #[arg(long)]
    port: Option<u16>,

    /// TOML session config (credentials, port, timings); flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load_from_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => SessionConfig::default(),
        };

        config.host = self.ip.clone();
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.debug {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = args.session_config()?;
    info!(host = %config.host, port = config.port, "Querying modem");

    let session = VdslSession::new(config)?;

    let cancel = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("User cancelled with ^C");
            cancel.cancel();
        }
    });

    let reading = session.run().await?;

    if !reading.diagnostics.is_empty() {
        warn!(
            missed = reading.diagnostics.len(),
            "Some fields could not be extracted"
        );
    }

    println!("{}", serde_json::to_string(&reading.record)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vigorstats-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_credentials_survive_without_flags() {
        let path = write_config("creds", "username = \"root\"\npassword = \"hunter2\"\nport = 2323\n");
        let args = Args::parse_from(["vigorstats", "10.0.0.1", "--config", path.to_str().unwrap()]);

        let config = args.session_config().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.username, "root");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.port, 2323);
    }

    #[test]
    fn test_flags_override_config() {
        let path = write_config("override", "username = \"root\"\npassword = \"hunter2\"\n");
        let args = Args::parse_from([
            "vigorstats",
            "10.0.0.1",
            "--config",
            path.to_str().unwrap(),
            "-u",
            "ops",
            "--port",
            "2424",
        ]);

        let config = args.session_config().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.username, "ops");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.port, 2424);
    }

    #[test]
    fn test_defaults_without_config() {
        let config = Args::parse_from(["vigorstats", "10.0.0.1"]).session_config().unwrap();
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "admin");
        assert_eq!(config.port, 23);
    }
}
