mod cli;

use clap::Parser;
use streamcat::{
    config::ClientConfig,
    util::{hook::set_panic_hook, log::initialize_logging},
};

use cli::{app::App, args::Cli};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> color_eyre::Result<()> {
    setup()?;

    let cli = Cli::parse();
    let mut config = ClientConfig::load();
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url);
    }
    if let Some(storage) = cli.storage {
        config = config.with_storage(storage);
    }

    let mut app = App::new(config)?;
    app.run(cli.command).await
}

fn setup() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    set_panic_hook();
    initialize_logging()
}
