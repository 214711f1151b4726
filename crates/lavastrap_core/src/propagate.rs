use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::layout::ResolvedLayout;

/// Copies the prepared bot configs into the checkout, replacing whatever is there.
pub fn propagate_configs(layout: &ResolvedLayout) -> Result<Vec<PathBuf>> {
    let copies = [
        (
            layout.template_lavalink_json.clone(),
            layout.checkout_lavalink_json(),
        ),
        (
            layout.template_icons_json.clone(),
            layout.checkout_icons_json(),
        ),
    ];

    let mut written = Vec::with_capacity(copies.len());
    for (source, destination) in copies {
        fs::copy(&source, &destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                source.display(),
                destination.display()
            )
        })?;
        written.push(destination);
    }
    Ok(written)
}
