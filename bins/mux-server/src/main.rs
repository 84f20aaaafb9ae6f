use clap::Parser;
use mux_engine::config::MuxConfig;
use mux_engine::registry::PluginRegistry;
use mux_engine::Engine;

#[derive(Parser)]
#[command(name = "mux-server", about = "Configurable log/event multiplexer")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(long, default_value = "mux.toml", env = "MUX_CONFIG")]
    config: String,
}

fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    mux_format_trim::register(&mut registry);
    mux_format_metadata_copy::register(&mut registry);
    mux_format_to_array::register(&mut registry);
    mux_format_template_json::register(&mut registry);
    mux_consumer_stdin::register(&mut registry);
    mux_consumer_tick::register(&mut registry);
    mux_producer_console::register(&mut registry);
    mux_producer_null::register(&mut registry);
    registry
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config, "loading configuration");
    let config = match MuxConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    tracing::info!(
        consumers = config.consumers.len(),
        producers = config.producers.len(),
        formatters = config.formatters.len(),
        "bootstrapping engine"
    );
    let registry = registry();
    let engine = match Engine::bootstrap(config, &registry).await {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "failed to bootstrap engine");
            std::process::exit(1);
        }
    };

    tracing::info!("mux-server started, press Ctrl+C to stop");
    if !engine.run().await {
        std::process::exit(1);
    }
}
