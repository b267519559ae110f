use clap::Parser;
use radserver::{AccountingLogger, Config, ConfigError, Server, ServerError, UserTableHandler};
use std::io;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// radserver - RFC 2865/2866 RADIUS authentication and accounting server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radserver")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config_path: String,

    /// Validate configuration and exit (doesn't start server)
    #[arg(short, long)]
    validate: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load or create configuration (without logging first)
    let config = match Config::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Initialize basic logging to show config creation messages
            tracing_subscriber::registry()
                .with(EnvFilter::new("info"))
                .with(tracing_subscriber::fmt::layer())
                .init();

            if cli.validate {
                eprintln!("Configuration validation failed: {}", e);
                process::exit(1);
            }

            // Only a missing file is replaced by the example; anything else
            // is the operator's file and must be left alone
            if !is_missing_file(&e) {
                error!("Invalid configuration in {}: {}", cli.config_path, e);
                process::exit(1);
            }

            warn!("Could not load config file from: {} ({})", cli.config_path, e);
            info!("Creating example configuration at: {}", cli.config_path);

            if let Err(e) = Config::example().to_file(&cli.config_path) {
                error!("Error creating example config: {}", e);
                process::exit(1);
            }

            info!("Please edit {} and restart the server", cli.config_path);
            process::exit(0);
        }
    };

    if cli.validate {
        println!("Configuration validated successfully");
        println!();
        println!("Configuration summary:");
        println!("  Listen: {} ({})", config.listen_address, config.network);
        println!("  Authentication port: {}", config.auth_port);
        if config.acct_port == 0 {
            println!("  Accounting: disabled");
        } else {
            println!("  Accounting port: {}", config.acct_port);
        }
        println!("  Clients: {}", config.clients.len());
        println!("  Users: {}", config.users.len());
        println!("  Log level: {}", config.log_level.as_deref().unwrap_or("info"));
        if let Some(ref path) = config.dictionary_path {
            println!("  Dictionary: {}", path);
        }
        process::exit(0);
    }

    let log_level = config.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("radserver v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config_path);

    if let Err(e) = run(config).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}

fn is_missing_file(e: &ConfigError) -> bool {
    matches!(e, ConfigError::Io(err) if err.kind() == io::ErrorKind::NotFound)
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let dictionary = config.load_dictionary()?;

    if config.clients.is_empty() {
        warn!("No clients configured, accepting requests from any address with the default secret");
    } else {
        for client in &config.clients {
            let name = client.name.as_deref().unwrap_or("(unnamed)");
            info!(
                address = %client.address,
                name = %name,
                enabled = client.enabled,
                "Configured client"
            );
        }
    }

    let auth_handler = Arc::new(UserTableHandler::from_users(&config.users));
    info!("Loaded {} users", auth_handler.len());

    let auth_server = Arc::new(Server::new(config.server_config(
        config.auth_addr()?,
        Arc::clone(&dictionary),
        auth_handler,
    )?));

    let acct_server = match config.acct_addr()? {
        Some(addr) => Some(Arc::new(Server::new(config.server_config(
            addr,
            Arc::clone(&dictionary),
            Arc::new(AccountingLogger),
        )?))),
        None => None,
    };

    {
        let auth_server = Arc::clone(&auth_server);
        let acct_server = acct_server.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                auth_server.close();
                if let Some(server) = acct_server {
                    server.close();
                }
            }
        });
    }

    let accounting = async {
        match acct_server {
            Some(ref server) => server.listen_and_serve().await,
            None => Ok::<(), ServerError>(()),
        }
    };
    tokio::try_join!(auth_server.listen_and_serve(), accounting)?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();

        let missing = Config::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(is_missing_file(&missing));

        let path = dir.path().join("typo.json");
        std::fs::write(&path, "{\"secret\": \"abc\",}").unwrap();
        let typo = Config::from_file(&path).unwrap_err();
        assert!(matches!(typo, ConfigError::Parse(_)));
        assert!(!is_missing_file(&typo));

        std::fs::write(&path, "{\"secret\": \"\"}").unwrap();
        let invalid = Config::from_file(&path).unwrap_err();
        assert!(!is_missing_file(&invalid));

        // Directory instead of a file is an IO error other than NotFound
        let not_a_file = Config::from_file(dir.path()).unwrap_err();
        assert!(!is_missing_file(&not_a_file));
    }
}
