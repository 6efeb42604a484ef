use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fitd_formats::{Edition, parse_cvars, parse_objects};

/// Print the world object table (and optionally the c-variables) as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to OBJETS.ITD
    objets: PathBuf,

    /// Optional DEFINES.ITD to decode alongside
    #[arg(long)]
    defines: Option<PathBuf>,

    /// Game release the files come from
    #[arg(long, value_enum, default_value_t = Edition::Aitd1)]
    edition: Edition,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes =
        fs::read(&args.objets).with_context(|| format!("reading {}", args.objets.display()))?;
    let objects = parse_objects(&bytes, args.edition)
        .with_context(|| format!("parsing {}", args.objets.display()))?;

    let cvars = match args.defines.as_ref() {
        Some(path) => {
            let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Some(parse_cvars(&bytes, args.edition)?)
        }
        None => None,
    };

    let report = serde_json::json!({
        "edition": args.edition,
        "objects": objects,
        "cvars": cvars,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
