//! double-check - compare query results between two database versions.

use double_check::cli::Cli;
use double_check::config::{Config, Side};
use double_check::connection::DsnConnectionProvider;
use double_check::error::Result;
use double_check::logging;
use double_check::report::ConsoleReporter;
use double_check::session::ComparisonSession;
use tracing::info;

#[tokio::main]
async fn main() {
    // A missing .env is fine; variables may come from the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.log_level());

    if let Err(e) = run(cli).await {
        eprintln!("{}", e.diagnostic());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration file
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let settings = cli.session_settings(&config);
    let provider = DsnConnectionProvider::new(
        cli.dsn(Side::V1, &config),
        cli.dsn(Side::V2, &config),
        config.query_timeout(),
    );
    let reporter = ConsoleReporter::stdout(!cli.no_color);

    let mut session = ComparisonSession::new(settings, provider, reporter);
    session.run().await?;

    Ok(())
}
