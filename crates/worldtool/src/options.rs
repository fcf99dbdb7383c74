//! Command-line options for the `cubeview` binary.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOptions {
    /// World directory to load from and save to.
    pub world_dir: PathBuf,
    /// Generate flat columns within this many chunks of the origin.
    pub generate: Option<u32>,
    /// Write updated chunks back on exit.
    pub save: bool,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            world_dir: PathBuf::from("world"),
            generate: None,
            save: true,
        }
    }
}

impl ToolOptions {
    /// Parse `--world <dir>`, `--generate <radius>` and `--no-save`.
    /// Unknown arguments are ignored.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let args: Vec<String> = args.into_iter().collect();
        let has = |flag: &str| args.iter().any(|a| a == flag);

        let mut options = ToolOptions::default();
        if let Some(dir) = flag_value(&args, "--world")? {
            options.world_dir = dir.into();
        }
        if let Some(radius) = flag_value(&args, "--generate")? {
            options.generate = Some(
                radius
                    .parse()
                    .with_context(|| format!("invalid --generate radius {:?}", radius))?,
            );
        }
        options.save = !has("--no-save");
        Ok(options)
    }
}

/// The argument following `flag`, if the flag is present. Another flag in
/// that position is an error rather than a value.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    let Some(at) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    match args.get(at + 1) {
        Some(value) if !value.starts_with("--") => Ok(Some(value.as_str())),
        _ => bail!("{} needs a value", flag),
    }
}
