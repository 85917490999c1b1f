use clap::Parser;
use dnssec_authgraph::{Analysis, GraphConfig, RecordType, StatusReport, analyze};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Build a DNSSEC authentication graph from a validator's analysis and
/// report the status of every key, RRset and proof in it
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Analysis document (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Trust anchor file (DNSKEY or DS presentation lines)
    #[arg(short, long)]
    trust_anchors: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Query to graph, as NAME/TYPE; repeatable. Defaults to every query in
    /// the analysis
    #[arg(short, long = "query", value_parser = parse_query)]
    queries: Vec<(String, RecordType)>,

    /// The analysis followed CNAME chains inside each response
    #[arg(short, long)]
    recursive: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn parse_query(s: &str) -> Result<(String, RecordType), String> {
    let (name, rdtype) = s
        .rsplit_once('/')
        .ok_or_else(|| format!("expected NAME/TYPE, got {s}"))?;
    if name.is_empty() {
        return Err(format!("missing name in {s}"));
    }
    Ok((name.to_string(), rdtype.parse::<RecordType>()?))
}

fn load_config(args: &Args) -> dnssec_authgraph::Result<GraphConfig> {
    let mut config = match &args.config {
        Some(path) => GraphConfig::from_file(path)?,
        None => GraphConfig::default(),
    };
    config.apply_env()?;
    if args.recursive {
        config.recursive = true;
    }
    if let Some(path) = &args.trust_anchors {
        config.trust_anchor_file = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    debug!(?config, "Loaded configuration");

    let text = std::fs::read_to_string(&args.input)?;
    let analysis: Analysis = serde_json::from_str(&text)?;
    info!(
        input = %args.input.display(),
        zones = analysis.zones().count(),
        names = analysis.names().count(),
        "Loaded analysis"
    );

    let anchors = config.trust_anchors()?;
    let graph = analyze(&analysis, &args.queries, &anchors, &config)?;
    println!("{}", StatusReport::from_graph(&graph).to_json()?);
    Ok(())
}
