use std::path::PathBuf;
use std::sync::Arc;

use a3s_event_exporter::{
    ChannelReceiverRegistry, Config, Engine, EventSource, KubectlFetcher, LinesEventSource, LogFormat,
    MetadataCache, MetadataField, ReceiverRegistry, Watcher,
};
use clap::Parser;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(
    name = "a3s-event-exporter",
    about = "Route cluster events to receivers through a rule tree"
)]
struct Cli {
    /// Path to the exporter config
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Watch stream to read (`-` for stdin), e.g. the output of
    /// `kubectl get events -A --watch --output-watch-events -o json | jq -c .`
    #[arg(short, long, default_value = "-")]
    input: String,

    /// kubeconfig context used for label/annotation lookups
    #[arg(long)]
    context: Option<String>,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    // Events go to stdout, so logs stay on stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("a3s-event-exporter: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let registry = Arc::new(ChannelReceiverRegistry::new(config.receiver_buffer_size));
    let engine = match Engine::new(&config, registry.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize receivers");
            registry.close().await;
            std::process::exit(1);
        }
    };

    let source: Box<dyn EventSource> = if cli.input == "-" {
        Box::new(LinesEventSource::new("stdin", BufReader::new(tokio::io::stdin())))
    } else {
        match tokio::fs::File::open(&cli.input).await {
            Ok(file) => Box::new(LinesEventSource::new(cli.input.clone(), BufReader::new(file))),
            Err(e) => {
                tracing::error!(input = %cli.input, error = %e, "Cannot open watch stream");
                std::process::exit(1);
            }
        }
    };

    let mut fetcher = KubectlFetcher::new();
    if let Some(context) = cli.context {
        fetcher = fetcher.with_context(context);
    }
    let fetcher = Arc::new(fetcher);

    let watcher = Watcher::new(
        source,
        config.watcher_config(),
        Arc::new(MetadataCache::new(fetcher.clone(), MetadataField::Labels, config.cache_size)),
        Arc::new(MetadataCache::new(fetcher, MetadataField::Annotations, config.cache_size)),
        engine.handler(),
        engine.checker(),
    );

    if let Err(e) = watcher.start().await {
        tracing::error!(error = %e, "Failed to start event watcher");
        std::process::exit(1);
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
        _ = watcher.wait_stopped() => {}
    }

    watcher.stop().await;
    engine.stop().await;
}
