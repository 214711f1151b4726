use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::prompt::Prompter;

pub const TOKEN_KEY: &str = "TOKEN";
pub const SPOTIFY_CLIENT_ID_KEY: &str = "SPOTIFY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET_KEY: &str = "SPOTIFY_CLIENT_SECRET";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub spotify: Option<SpotifyCredentials>,
}

impl Credentials {
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = vec![TOKEN_KEY];
        if self.spotify.is_some() {
            keys.extend([SPOTIFY_CLIENT_ID_KEY, SPOTIFY_CLIENT_SECRET_KEY]);
        }
        keys
    }

    /// One `KEY=value` line per secret.
    pub fn render(&self) -> String {
        let mut out = format!("{TOKEN_KEY}={}\n", self.token);
        if let Some(spotify) = &self.spotify {
            out.push_str(&format!("{SPOTIFY_CLIENT_ID_KEY}={}\n", spotify.client_id));
            out.push_str(&format!(
                "{SPOTIFY_CLIENT_SECRET_KEY}={}\n",
                spotify.client_secret
            ));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsOutcome {
    AlreadyExists,
    Created { keys: Vec<&'static str> },
}

pub fn collect_credentials<P: Prompter + ?Sized>(prompter: &mut P) -> Result<Credentials> {
    let token = prompter.secret(TOKEN_KEY)?;
    let spotify = if prompter.confirm("Do you want to enable Spotify support?", false)? {
        let client_id = prompter.text("Spotify Client ID", None)?;
        let client_secret = prompter.secret("Spotify Client Secret")?;
        Some(SpotifyCredentials {
            client_id,
            client_secret,
        })
    } else {
        None
    };
    Ok(Credentials { token, spotify })
}

/// Creates the credentials file from operator answers unless it already exists.
///
/// The file is written only once every answer has been collected; any failure
/// on the way (including [`crate::prompt::Interrupted`]) leaves no file behind
/// and is returned unchanged so the caller can abort the run.
pub fn ensure_credentials<P: Prompter + ?Sized>(
    path: &Path,
    prompter: &mut P,
) -> Result<CredentialsOutcome> {
    if path.is_file() {
        return Ok(CredentialsOutcome::AlreadyExists);
    }

    let written = collect_credentials(prompter).and_then(|credentials| {
        fs::write(path, credentials.render())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(credentials)
    });

    match written {
        Ok(credentials) => Ok(CredentialsOutcome::Created {
            keys: credentials.keys(),
        }),
        Err(error) => {
            if path.is_file() {
                debug!(path = %path.display(), "removing partial credentials file");
                fs::remove_file(path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
            Err(error)
        }
    }
}

/// Keys present in an existing credentials file. Values are never returned.
pub fn read_credential_keys(path: &Path) -> Result<Vec<String>> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut keys = Vec::new();
    for entry in entries {
        let (key, _) = entry.with_context(|| format!("failed to parse {}", path.display()))?;
        keys.push(key);
    }
    Ok(keys)
}
