use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Once,
};

use dirs::home_dir;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIR_NAME: &str = ".budget_tracker";
pub const HOME_ENV: &str = "BUDGET_TRACKER_HOME";

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{
            filter::{Directive, LevelFilter},
            fmt, EnvFilter,
        };

        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy();
        let filter = match "budget_tracker=info".parse::<Directive>() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        };

        // A subscriber installed by the host application wins.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

/// Returns the application data directory, defaulting to `~/.budget_tracker`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
