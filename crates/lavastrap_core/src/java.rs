use std::env;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::debug;

use crate::http::HttpFetcher;
use crate::layout::ResolvedLayout;
use crate::settings::InstallerSettings;

pub const RUNTIME_DIR_PREFIX: &str = "jdk";
pub const CANONICAL_RUNTIME_DIR: &str = "jdk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOutcome {
    Installed { release: String, archive: String },
    AlreadyPresent,
    UnsupportedVersion,
}

/// Adoptium's names for the host operating system and CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub architecture: &'static str,
}

impl Platform {
    pub fn current() -> Result<Self> {
        Self::from_rust(env::consts::OS, env::consts::ARCH)
    }

    pub fn from_rust(os: &str, arch: &str) -> Result<Self> {
        let os = match os {
            "linux" => "linux",
            "macos" => "mac",
            "windows" => "windows",
            "aix" => "aix",
            "solaris" => "solaris",
            other => bail!("no Java runtime builds are published for OS {other}"),
        };
        let architecture = match arch {
            "x86_64" => "x64",
            "x86" => "x32",
            "aarch64" => "aarch64",
            "arm" => "arm",
            "powerpc64" => "ppc64",
            "s390x" => "s390x",
            other => bail!("no Java runtime builds are published for architecture {other}"),
        };
        Ok(Self { os, architecture })
    }
}

#[derive(Debug, Deserialize)]
struct RuntimeAsset {
    binary: RuntimeBinary,
    #[serde(default)]
    release_name: String,
}

#[derive(Debug, Deserialize)]
struct RuntimeBinary {
    package: RuntimePackage,
}

#[derive(Debug, Deserialize)]
struct RuntimePackage {
    link: String,
    name: String,
}

pub fn ensure_java_runtime<H: HttpFetcher>(
    layout: &ResolvedLayout,
    settings: &InstallerSettings,
    fetcher: &mut H,
) -> Result<RuntimeOutcome> {
    if layout.java_root.exists() {
        return Ok(RuntimeOutcome::AlreadyPresent);
    }
    install_runtime(&layout.java_root, settings, Platform::current()?, fetcher)
}

fn install_runtime<H: HttpFetcher>(
    root: &Path,
    settings: &InstallerSettings,
    platform: Platform,
    fetcher: &mut H,
) -> Result<RuntimeOutcome> {
    let url = format!(
        "{}/assets/latest/{}/hotspot",
        settings.java_api_url.trim_end_matches('/'),
        settings.java_version
    );
    let payload = fetcher.get_json(
        &url,
        &[
            ("architecture", platform.architecture),
            ("image_type", "jre"),
            ("os", platform.os),
            ("vendor", "eclipse"),
        ],
    )?;
    let assets: Vec<RuntimeAsset> = serde_json::from_value(payload)
        .with_context(|| format!("unexpected runtime listing from {url}"))?;
    let Some(asset) = assets.into_iter().next() else {
        debug!(version = %settings.java_version, ?platform, "no runtime release matched");
        return Ok(RuntimeOutcome::UnsupportedVersion);
    };

    let package = asset.binary.package;
    let archive = fetcher.download(&package.link)?;
    fs::create_dir_all(root).with_context(|| format!("failed to create {}", root.display()))?;
    extract_archive(&package.name, &archive, root)?;

    Ok(RuntimeOutcome::Installed {
        release: asset.release_name,
        archive: package.name,
    })
}

fn extract_archive(name: &str, bytes: &[u8], root: &Path) -> Result<()> {
    if name.ends_with(".zip") {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .with_context(|| format!("failed to open {name}"))?;
        archive
            .extract(root)
            .with_context(|| format!("failed to extract {name} into {}", root.display()))?;
        return Ok(());
    }

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let archive_path = root.join(name);
        fs::write(&archive_path, bytes)
            .with_context(|| format!("failed to write {}", archive_path.display()))?;
        let output = Command::new("tar")
            .arg("-xzf")
            .arg(&archive_path)
            .arg("-C")
            .arg(root)
            .output()
            .context("failed to execute tar command")?;
        fs::remove_file(&archive_path)
            .with_context(|| format!("failed to remove {}", archive_path.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tar failed to extract {name}: {}", stderr.trim()));
        }
        return Ok(());
    }

    bail!("unsupported runtime archive format: {name}")
}

/// Renames the first `jdk*` entry under `root` to `jdk`.
///
/// Does nothing when `root` is missing, when `jdk` already exists, or when no
/// entry carries the prefix.
pub fn normalize_runtime_dir(root: &Path) -> Result<Option<PathBuf>> {
    if !root.is_dir() {
        return Ok(None);
    }
    let canonical = root.join(CANONICAL_RUNTIME_DIR);
    if canonical.exists() {
        return Ok(None);
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("failed to read {}", root.display()))?
    {
        let entry = entry.with_context(|| format!("failed to read {}", root.display()))?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();

    let Some(found) = names
        .into_iter()
        .find(|name| name.starts_with(RUNTIME_DIR_PREFIX))
    else {
        return Ok(None);
    };

    let source = root.join(&found);
    fs::rename(&source, &canonical).with_context(|| {
        format!(
            "failed to rename {} to {}",
            source.display(),
            canonical.display()
        )
    })?;
    debug!(from = %source.display(), to = %canonical.display(), "normalized runtime directory");
    Ok(Some(canonical))
}
