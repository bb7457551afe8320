use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn filter_for(verbosity: u8) -> Result<EnvFilter> {
    let directive = format!("memtrend={}", level_for(verbosity));
    Ok(EnvFilter::from_default_env().add_directive(directive.parse()?))
}

/// Human-readable logs on stderr, for the batch commands.
pub fn init_stderr(verbosity: u8) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

/// JSON lines into `path`. The live chart owns the terminal, so this is the
/// only place its logs can go.
pub fn init_json_file(path: &Path, verbosity: u8) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity)?)
        .with_ansi(false)
        .json()
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(level_for(0), Level::INFO);
        assert_eq!(level_for(1), Level::DEBUG);
        assert_eq!(level_for(5), Level::TRACE);
    }
}
