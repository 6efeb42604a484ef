use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use fitd_formats::PakArchive;
use walkdir::WalkDir;

/// List the entries of one PAK archive, or of every PAK under a directory.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// PAK file or directory containing PAK files
    path: PathBuf,

    /// Print the entry tables as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = collect_paks(&args.path)?;
    if paths.is_empty() {
        bail!("no PAK archives found under {}", args.path.display());
    }

    for path in paths {
        let archive = PakArchive::open(&path)?;
        if args.json {
            let json = serde_json::to_string_pretty(archive.entries())
                .context("serializing PAK entries")?;
            println!("{json}");
            continue;
        }
        println!(
            "{} entries in {}",
            archive.entries().len(),
            archive.path().display()
        );
        for entry in archive.entries() {
            println!(
                "{index:>4} {name:<16} {compression:<12} {disc:>8} {loaded:>8}",
                index = entry.index,
                name = entry.name.as_deref().unwrap_or("-"),
                compression = format!("{:?}", entry.compression),
                disc = entry.disc_size,
                loaded = entry.loaded_size()
            );
        }
    }
    Ok(())
}

fn collect_paks(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_pak = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pak"))
            .unwrap_or(false);
        if is_pak {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}
