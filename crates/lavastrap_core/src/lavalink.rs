use std::fs;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::http::HttpFetcher;
use crate::layout::ResolvedLayout;
use crate::settings::InstallerSettings;

pub const JAR_FILENAME: &str = "Lavalink.jar";

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LavalinkOutcome {
    AlreadyInstalled,
    Installed {
        tag: String,
        asset: String,
        bytes: usize,
    },
}

/// Picks the server jar out of a release: an exact `Lavalink.jar`, then any
/// `.jar`, then whatever is listed first.
pub fn select_release_asset(release: &Release) -> Result<&ReleaseAsset> {
    release
        .assets
        .iter()
        .find(|asset| asset.name == JAR_FILENAME)
        .or_else(|| {
            release
                .assets
                .iter()
                .find(|asset| asset.name.to_ascii_lowercase().ends_with(".jar"))
        })
        .or_else(|| release.assets.first())
        .ok_or_else(|| anyhow!("release {} has no downloadable assets", release.tag_name))
}

pub fn ensure_lavalink<H: HttpFetcher>(
    layout: &ResolvedLayout,
    settings: &InstallerSettings,
    fetcher: &mut H,
) -> Result<LavalinkOutcome> {
    if layout.lavalink_jar.is_file() {
        return Ok(LavalinkOutcome::AlreadyInstalled);
    }

    fs::create_dir_all(&layout.lavalink_dir)
        .with_context(|| format!("failed to create {}", layout.lavalink_dir.display()))?;

    let payload = fetcher.get_json(&settings.lavalink_release_url, &[])?;
    let release: Release = serde_json::from_value(payload).with_context(|| {
        format!(
            "unexpected release metadata from {}",
            settings.lavalink_release_url
        )
    })?;
    let asset = select_release_asset(&release)?.clone();
    let jar = fetcher.download(&asset.browser_download_url)?;
    fs::write(&layout.lavalink_jar, &jar)
        .with_context(|| format!("failed to write {}", layout.lavalink_jar.display()))?;

    fs::copy(&layout.template_application_yml, &layout.lavalink_config).with_context(|| {
        format!(
            "failed to copy {} to {}",
            layout.template_application_yml.display(),
            layout.lavalink_config.display()
        )
    })?;

    Ok(LavalinkOutcome::Installed {
        tag: release.tag_name,
        asset: asset.name,
        bytes: jar.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::{LavalinkOutcome, Release, ensure_lavalink, select_release_asset};
    use crate::http::mock::MockFetcher;
    use crate::layout::{ResolvedLayout, ValueSource};
    use crate::settings::{DEFAULT_LAVALINK_RELEASE_URL, InstallerSettings};

    fn release(assets: serde_json::Value) -> Release {
        serde_json::from_value(json!({"tag_name": "4.0.8", "assets": assets})).expect("release")
    }

    #[test]
    fn selection_prefers_server_jar_over_listing_order() {
        let release = release(json!([
            {"name": "Lavalink.jar.sha256", "browser_download_url": "https://x/sha"},
            {"name": "Lavalink-musl.jar", "browser_download_url": "https://x/musl"},
            {"name": "Lavalink.jar", "browser_download_url": "https://x/jar"}
        ]));
        assert_eq!(
            select_release_asset(&release).expect("asset").browser_download_url,
            "https://x/jar"
        );
    }

    #[test]
    fn selection_falls_back_to_any_jar_then_first_asset() {
        let release_with_jar = release(json!([
            {"name": "notes.txt", "browser_download_url": "https://x/notes"},
            {"name": "server.JAR", "browser_download_url": "https://x/server"}
        ]));
        assert_eq!(
            select_release_asset(&release_with_jar).expect("asset").name,
            "server.JAR"
        );

        let release_without_jar = release(json!([
            {"name": "bundle.zip", "browser_download_url": "https://x/bundle"}
        ]));
        assert_eq!(
            select_release_asset(&release_without_jar).expect("asset").name,
            "bundle.zip"
        );

        let err = select_release_asset(&release(json!([]))).expect_err("must fail");
        assert!(err.to_string().contains("has no downloadable assets"));
    }

    #[test]
    fn installs_jar_and_config() {
        let temp = tempdir().expect("tempdir");
        let layout = ResolvedLayout::from_root(temp.path(), ValueSource::Default);
        fs::create_dir_all(&layout.templates_dir).expect("templates");
        fs::write(&layout.template_application_yml, "server:\n  port: 2333\n").expect("yml");

        let mut fetcher = MockFetcher::default();
        fetcher.json.insert(
            DEFAULT_LAVALINK_RELEASE_URL.to_string(),
            json!({
                "tag_name": "4.0.8",
                "assets": [{"name": "Lavalink.jar", "browser_download_url": "https://x/jar"}]
            }),
        );
        fetcher
            .files
            .insert("https://x/jar".to_string(), b"PK-jar".to_vec());

        let outcome =
            ensure_lavalink(&layout, &InstallerSettings::default(), &mut fetcher).expect("install");
        assert_eq!(
            outcome,
            LavalinkOutcome::Installed {
                tag: "4.0.8".to_string(),
                asset: "Lavalink.jar".to_string(),
                bytes: 6,
            }
        );
        assert_eq!(fs::read(&layout.lavalink_jar).expect("jar"), b"PK-jar");
        assert_eq!(
            fs::read_to_string(&layout.lavalink_config).expect("config"),
            "server:\n  port: 2333\n"
        );
    }

    #[test]
    fn existing_jar_short_circuits_without_network() {
        let temp = tempdir().expect("tempdir");
        let layout = ResolvedLayout::from_root(temp.path(), ValueSource::Default);
        fs::create_dir_all(&layout.lavalink_dir).expect("lavalink dir");
        fs::write(&layout.lavalink_jar, b"old build").expect("jar");
        let mut fetcher = MockFetcher::default();

        let outcome =
            ensure_lavalink(&layout, &InstallerSettings::default(), &mut fetcher).expect("ensure");
        assert_eq!(outcome, LavalinkOutcome::AlreadyInstalled);
        assert!(fetcher.requests.is_empty());
        assert_eq!(fs::read(&layout.lavalink_jar).expect("jar"), b"old build");
        assert!(!layout.lavalink_config.exists());
    }

    #[test]
    fn release_without_assets_fails_before_writing() {
        let temp = tempdir().expect("tempdir");
        let layout = ResolvedLayout::from_root(temp.path(), ValueSource::Default);
        let mut fetcher = MockFetcher::default();
        fetcher.json.insert(
            DEFAULT_LAVALINK_RELEASE_URL.to_string(),
            json!({"tag_name": "4.0.8", "assets": []}),
        );

        let err =
            ensure_lavalink(&layout, &InstallerSettings::default(), &mut fetcher).expect_err("fail");
        assert!(err.to_string().contains("has no downloadable assets"));
        assert!(!layout.lavalink_jar.exists());
    }
}
