use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::secrets::read_credential_keys;

pub const ROOT_ENV_KEY: &str = "LAVASTRAP_ROOT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutOverrides {
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

/// Every filesystem location the installer touches, resolved against one root.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    pub root: PathBuf,
    pub checkout_dir: PathBuf,
    pub checkout_configs_dir: PathBuf,
    pub env_file: PathBuf,
    pub templates_dir: PathBuf,
    pub template_lavalink_json: PathBuf,
    pub template_application_yml: PathBuf,
    pub template_icons_json: PathBuf,
    pub java_root: PathBuf,
    pub java_home: PathBuf,
    pub lavalink_dir: PathBuf,
    pub lavalink_jar: PathBuf,
    pub lavalink_config: PathBuf,
    pub root_source: ValueSource,
}

impl ResolvedLayout {
    pub fn from_root(root: &Path, root_source: ValueSource) -> Self {
        let checkout_dir = root.join("lava");
        let templates_dir = root.join("configs");
        let java_root = root.join("java");
        let lavalink_dir = root.join("lavalink");
        Self {
            root: root.to_path_buf(),
            checkout_configs_dir: checkout_dir.join("configs"),
            checkout_dir,
            env_file: root.join(".env"),
            template_lavalink_json: templates_dir.join("lavalink.json"),
            template_application_yml: templates_dir.join("application.yml"),
            template_icons_json: templates_dir.join("icons.json"),
            templates_dir,
            java_home: java_root.join(crate::java::CANONICAL_RUNTIME_DIR),
            java_root,
            lavalink_jar: lavalink_dir.join(crate::lavalink::JAR_FILENAME),
            lavalink_config: lavalink_dir.join("application.yml"),
            lavalink_dir,
            root_source,
        }
    }

    /// Destination of the propagated `lavalink.json` inside the checkout.
    pub fn checkout_lavalink_json(&self) -> PathBuf {
        self.checkout_configs_dir.join("lavalink.json")
    }

    pub fn checkout_icons_json(&self) -> PathBuf {
        self.checkout_configs_dir.join("icons.json")
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "root={} ({})\ncheckout_dir={}\nenv_file={}\ntemplates_dir={}\njava_root={}\njava_home={}\nlavalink_dir={}\nlavalink_jar={}",
            normalize_for_display(&self.root),
            self.root_source.as_str(),
            normalize_for_display(&self.checkout_dir),
            normalize_for_display(&self.env_file),
            normalize_for_display(&self.templates_dir),
            normalize_for_display(&self.java_root),
            normalize_for_display(&self.java_home),
            normalize_for_display(&self.lavalink_dir),
            normalize_for_display(&self.lavalink_jar),
        )
    }
}

#[derive(Debug, Clone)]
pub struct LayoutStatus {
    pub checkout_exists: bool,
    pub env_file_exists: bool,
    pub credential_keys: Vec<String>,
    pub templates_exist: bool,
    pub checkout_lavalink_json_exists: bool,
    pub checkout_icons_json_exists: bool,
    pub java_root_exists: bool,
    pub java_home_exists: bool,
    pub lavalink_jar_exists: bool,
    pub lavalink_jar_bytes: Option<u64>,
    pub lavalink_config_exists: bool,
    pub warnings: Vec<String>,
}

pub fn resolve_layout(
    context: &ResolutionContext,
    overrides: &LayoutOverrides,
) -> ResolvedLayout {
    resolve_layout_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_layout_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &LayoutOverrides,
    lookup_env: F,
) -> ResolvedLayout
where
    F: Fn(&str) -> Option<String>,
{
    let (root, source) = if let Some(path) = overrides.root.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = lookup_env(ROOT_ENV_KEY).filter(|value| !value.trim().is_empty())
    {
        (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        )
    } else {
        (context.cwd.clone(), ValueSource::Default)
    };
    ResolvedLayout::from_root(&root, source)
}

pub fn inspect_layout(layout: &ResolvedLayout) -> Result<LayoutStatus> {
    let env_file_exists = layout.env_file.is_file();
    let credential_keys = if env_file_exists {
        read_credential_keys(&layout.env_file)?
    } else {
        Vec::new()
    };
    let lavalink_jar_exists = layout.lavalink_jar.is_file();
    let lavalink_jar_bytes = if lavalink_jar_exists {
        let metadata = fs::metadata(&layout.lavalink_jar)
            .with_context(|| format!("failed to inspect {}", layout.lavalink_jar.display()))?;
        Some(metadata.len())
    } else {
        None
    };

    let mut warnings = Vec::new();
    let mut templates_exist = true;
    for template in [
        &layout.template_lavalink_json,
        &layout.template_application_yml,
        &layout.template_icons_json,
    ] {
        if !template.is_file() {
            templates_exist = false;
            warnings.push(format!(
                "{} is missing; port and config steps will fail",
                normalize_for_display(template)
            ));
        }
    }
    if env_file_exists && !credential_keys.iter().any(|key| key == "TOKEN") {
        warnings.push(".env has no TOKEN entry".to_string());
    }

    Ok(LayoutStatus {
        checkout_exists: layout.checkout_dir.exists(),
        env_file_exists,
        credential_keys,
        templates_exist,
        checkout_lavalink_json_exists: layout.checkout_lavalink_json().is_file(),
        checkout_icons_json_exists: layout.checkout_icons_json().is_file(),
        java_root_exists: layout.java_root.is_dir(),
        java_home_exists: layout.java_home.is_dir(),
        lavalink_jar_exists,
        lavalink_jar_bytes,
        lavalink_config_exists: layout.lavalink_config.is_file(),
        warnings,
    })
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
