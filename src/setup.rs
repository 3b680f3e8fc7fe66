// Copyright 2025 Cornell University
// released under MIT License

use crate::config::GeneratorConfig;
use crate::diagnostic::{DiagnosticHandler, Level};
use crate::network::{generate, Network};
use crate::parser::parse_file;
use crate::serialize::serialize_to_string;
use anyhow::Context;
use log::info;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads the PLC configuration at `config_path` and generates the network.
/// Every failure is also reported through `handler`: configuration problems
/// point into the file, generation problems (such as a signal named like a
/// generated channel) are reported without a location.
pub fn generate_from_file(
    config_path: impl AsRef<Path>,
    config: &GeneratorConfig,
    handler: &mut DiagnosticHandler,
) -> anyhow::Result<Network> {
    let path = config_path.as_ref();
    let signals = parse_file(path, handler)
        .with_context(|| format!("invalid configuration `{}`", path.display()))?;
    match generate(&signals, config) {
        Ok(network) => Ok(network),
        Err(err) => {
            handler.emit_general_message(&err.to_string(), Level::Error);
            Err(err).context("failed to generate the model")
        }
    }
}

/// Writes `network` to `output_path`. The document is written to a
/// temporary file next to the target first, so the target is either
/// replaced completely or left untouched.
pub fn write_network(network: &Network, output_path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = output_path.as_ref();
    let xml = serialize_to_string(network)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create a temporary file in `{}`", dir.display()))?;
    tmp.write_all(xml.as_bytes())?;
    tmp.persist(path)
        .with_context(|| format!("failed to write `{}`", path.display()))?;

    info!("wrote {} bytes to {}", xml.len(), path.display());
    Ok(())
}

/// Configuration file in, UPPAAL model out
pub fn run(
    config_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &GeneratorConfig,
    handler: &mut DiagnosticHandler,
) -> anyhow::Result<()> {
    let network = generate_from_file(config_path, config, handler)?;
    write_network(&network, output_path)
}
