use crate::prelude::*;
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

pub struct Logging;

impl Logging {
    pub fn try_init(verbose: bool) -> Result<()> {
        let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::builder().with_default_directive(level.into()).from_env_lossy(),
            )
            .try_init()
            .map_err(|err| eyre!("unable to set global logging subscriber: {err}"))
    }
}
