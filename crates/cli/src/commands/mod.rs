//! Subcommand implementations.

pub mod config_cmd;
pub mod grade;
pub mod query;
pub mod respond;
pub mod retrieve;
pub mod stats;

use lexiscope_config::AppConfig;
use lexiscope_core::{Error, Result};
use lexiscope_knowledge::{JsonBundle, KnowledgeEngine};
use std::sync::Arc;

use crate::SessionArgs;

/// Load the configuration named by `--config`, or the default one.
pub fn load_config(args: &SessionArgs) -> Result<AppConfig> {
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| Error::Config {
        message: e.to_string(),
    })
}

/// Start a session engine for the avatar. A bundle, if given, backs the
/// loader, the curriculum fetcher and passage search.
pub async fn open_session(args: &SessionArgs) -> Result<KnowledgeEngine> {
    let config = load_config(args)?;
    let builder = KnowledgeEngine::builder(config);

    let builder = match &args.bundle {
        Some(path) => {
            let bundle = Arc::new(JsonBundle::open(path).await?);
            builder
                .with_loader(bundle.clone())
                .with_fetcher(bundle.clone())
                .with_search(bundle)
        }
        None => builder,
    };

    Ok(builder.initialize(args.avatar.clone()).await)
}
