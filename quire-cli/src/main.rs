use anyhow::Result;
use clap::{Arg, ArgAction, Command, value_parser};
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;

use config::{DEFAULT_CONFIG_FILE, QuireConfig};

pub fn cli() -> Command {
    Command::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build a static site from posts, docs and hand-written pages")
        .arg(
            Arg::new("dev")
                .long("dev")
                .help("Serve the site on demand instead of writing it to disk")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dev-port")
                .long("dev-port")
                .value_name("PORT")
                .help("Port for the dev server")
                .value_parser(value_parser!(u16))
                .default_value("3000"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host for the dev server to bind to")
                .default_value("127.0.0.1"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open a browser once the dev server is up")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .default_value(DEFAULT_CONFIG_FILE),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins, otherwise info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let matches = cli().get_matches();
    let config = QuireConfig::load(&matches)?;

    if config.serve.dev {
        cmd::serve::execute(config).await
    } else {
        cmd::build::execute(config)
    }
}
