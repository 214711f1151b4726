use std::env;

pub const DEFAULT_REPO_URL: &str = "https://github.com/Nat1anWasTaken/Lava.git";
pub const REPO_BRANCH: &str = "master";
pub const DEFAULT_LAVALINK_RELEASE_URL: &str =
    "https://api.github.com/repos/freyacodes/Lavalink/releases/latest";
pub const DEFAULT_JAVA_API_URL: &str = "https://api.adoptium.net/v3";
pub const JAVA_VERSION: &str = "17";
pub const DEFAULT_USER_AGENT: &str = concat!("lavastrap/", env!("CARGO_PKG_VERSION"));
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 300_000;

/// Remote endpoints and knobs for the network-facing steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerSettings {
    pub repo_url: String,
    pub branch: String,
    pub lavalink_release_url: String,
    pub java_api_url: String,
    pub java_version: String,
    pub user_agent: String,
    pub http_timeout_ms: u64,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl InstallerSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| {
            lookup_env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let http_timeout_ms = lookup_env("LAVASTRAP_HTTP_TIMEOUT_MS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS);

        Self {
            repo_url: value("git_repo", DEFAULT_REPO_URL),
            branch: REPO_BRANCH.to_string(),
            lavalink_release_url: value("LAVALINK_RELEASE_URL", DEFAULT_LAVALINK_RELEASE_URL),
            java_api_url: value("JAVA_API_URL", DEFAULT_JAVA_API_URL),
            java_version: JAVA_VERSION.to_string(),
            user_agent: value("LAVASTRAP_USER_AGENT", DEFAULT_USER_AGENT),
            http_timeout_ms,
        }
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "repo_url={}\nbranch={}\nlavalink_release_url={}\njava_api_url={}\njava_version={}\nuser_agent={}\nhttp_timeout_ms={}",
            self.repo_url,
            self.branch,
            self.lavalink_release_url,
            self.java_api_url,
            self.java_version,
            self.user_agent,
            self.http_timeout_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_point_at_upstream_projects() {
        let settings = InstallerSettings::default();
        assert_eq!(settings.repo_url, DEFAULT_REPO_URL);
        assert_eq!(settings.branch, "master");
        assert_eq!(settings.java_version, "17");
        assert_eq!(settings.http_timeout_ms, 300_000);
        assert!(settings.user_agent.starts_with("lavastrap/"));
    }

    #[test]
    fn git_repo_env_overrides_clone_url() {
        let env = HashMap::from([
            ("git_repo".to_string(), " https://example.org/fork.git ".to_string()),
            ("LAVASTRAP_HTTP_TIMEOUT_MS".to_string(), "1500".to_string()),
        ]);
        let settings = InstallerSettings::from_lookup(|key| env.get(key).cloned());
        assert_eq!(settings.repo_url, "https://example.org/fork.git");
        assert_eq!(settings.http_timeout_ms, 1500);
        assert_eq!(settings.lavalink_release_url, DEFAULT_LAVALINK_RELEASE_URL);
    }

    #[test]
    fn blank_and_invalid_values_fall_back_to_defaults() {
        let env = HashMap::from([
            ("git_repo".to_string(), "   ".to_string()),
            ("LAVASTRAP_HTTP_TIMEOUT_MS".to_string(), "soon".to_string()),
        ]);
        let settings = InstallerSettings::from_lookup(|key| env.get(key).cloned());
        assert_eq!(settings.repo_url, DEFAULT_REPO_URL);
        assert_eq!(settings.http_timeout_ms, 300_000);
    }
}
