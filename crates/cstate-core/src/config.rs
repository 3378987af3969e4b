use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Worker count used when nothing else is configured.
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Stop a batch at the first changeset that fails to reconstruct.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// Output mode name as decided by the caller from flags, `FORMAT` and
    /// [`UserConfig::output`].
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
    pub resolved_workers: usize,
}

/// Load `.cstate/config.toml` under `project_root`, or defaults if absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".cstate/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// # Errors
///
/// Returns an error if the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("cstate/config.toml"))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load both config files and resolve the worker count.
///
/// `resolve_output` receives the user config's `output` and returns the name
/// of the output mode in effect.
///
/// # Errors
///
/// Returns an error if either config file is invalid or the worker count
/// resolves to something other than a positive integer.
pub fn resolve_config(
    project_root: &Path,
    cli_workers: Option<usize>,
    resolve_output: impl FnOnce(Option<&str>) -> String,
) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let resolved_output = resolve_output(user.output.as_deref());
    let resolved_workers = resolve_workers(
        cli_workers,
        env::var("CSTATE_WORKERS").ok(),
        project.sync.workers,
    )?;

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
        resolved_workers,
    })
}

/// CLI flag, then `CSTATE_WORKERS`, then the project config.
fn resolve_workers(
    cli_workers: Option<usize>,
    env_workers: Option<String>,
    project_workers: usize,
) -> Result<usize> {
    let workers = match (cli_workers, env_workers) {
        (Some(n), _) => n,
        (None, Some(raw)) => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("CSTATE_WORKERS must be a positive integer, got {raw:?}"))?,
        (None, None) => project_workers,
    };
    if workers == 0 {
        bail!("worker count must be at least 1");
    }
    Ok(workers)
}

const fn default_workers() -> usize {
    DEFAULT_WORKERS
}
