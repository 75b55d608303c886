//! livedata-paths
//!
//! Prints how a logical path is scoped for a tenant and where it lands in the
//! document store.

use std::path::PathBuf;

use anyhow::Context;
use averzo_livedata::config::LiveDataConfig;
use averzo_livedata::observability::init_logging;
use averzo_livedata::path::{LogicalPath, PathNormalizer};
use averzo_livedata::tenant::TenantId;
use clap::Parser;
use serde_json::json;
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(name = "livedata-paths")]
#[command(about = "Resolve logical collection paths to tenant-scoped storage paths")]
#[command(version)]
struct Args {
    /// Logical collection path, e.g. `products` or `users/u1/orders`.
    path: String,

    /// Document id to append after normalizing the collection.
    #[arg(long)]
    document: Option<String>,

    /// Tenant (deployment) identifier. Omit to see the unscoped result.
    #[arg(long, env = "LIVEDATA_TENANT")]
    tenant: Option<String>,

    /// JSON configuration file overriding the path markers.
    #[arg(long, env = "LIVEDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Print a JSON object instead of plain text.
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn", env = "LIVEDATA_LOG_LEVEL")]
    log_level: String,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LiveDataConfig> {
    let Some(path) = path else {
        return Ok(LiveDataConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = LiveDataConfig::from_json_str(&raw)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    debug!(config = ?config, "Loaded configuration");
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_config(args.config.as_ref())?;
    let normalizer = PathNormalizer::new(&config);
    let tenant = args.tenant.as_deref().map(TenantId::new);

    if let Some(tenant) = &tenant {
        if !tenant.is_valid_segment() {
            warn!(tenant = %tenant, "Tenant id is not a single path segment");
        }
    }

    let logical = LogicalPath::parse(&args.path);
    let scope = normalizer.classify(&logical, tenant.as_ref());
    let physical = match &args.document {
        Some(id) => normalizer.normalize_document(&logical, id, tenant.as_ref()),
        None => normalizer.normalize(&logical, tenant.as_ref()),
    };

    if args.json {
        let out = json!({
            "logical": logical.to_string(),
            "tenant": tenant.as_ref().map(TenantId::as_str),
            "scope": scope,
            "physical": physical.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{} [{}] -> {}", logical, scope, physical);
    }

    Ok(())
}
