use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fitd_formats::{Edition, Expr, Operand, PakArchive, disassemble_life, disassemble_track, read_words};

/// Decode a LIFE script (or a track program) to symbolic opcodes.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// LISTLIFE/LISTTRAK archive, or a raw resource with --raw
    path: PathBuf,

    /// Entry index inside the archive
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Treat the path as a raw word stream instead of a PAK archive
    #[arg(long)]
    raw: bool,

    /// Decode as a track program
    #[arg(long)]
    track: bool,

    /// Game release whose opcode numbering applies
    #[arg(long, value_enum, default_value_t = Edition::Aitd1)]
    edition: Edition,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes = if args.raw {
        fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?
    } else {
        let archive = PakArchive::open(&args.path)?;
        archive.read_index(args.index)?.to_vec()
    };
    let words = read_words(&bytes);

    if args.track {
        let statements = disassemble_track(&words, args.edition)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&statements)?);
            return Ok(());
        }
        for statement in statements {
            println!(
                "{:>4}: {:?} {:?}",
                statement.position, statement.op, statement.operands
            );
        }
        return Ok(());
    }

    let statements = disassemble_life(&words, args.edition)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
        return Ok(());
    }
    for statement in statements {
        let target = statement
            .target
            .map(|object| format!("[obj {object}] "))
            .unwrap_or_default();
        let operands: Vec<String> = statement.operands.iter().map(format_operand).collect();
        println!(
            "{:>6x}: {target}{} {}",
            statement.offset,
            statement.op.name(),
            operands.join(", ")
        );
    }
    Ok(())
}

fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Word(value) => value.to_string(),
        Operand::Expr(expr) => format_expr(expr),
    }
}

fn format_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(value) => value.to_string(),
        Expr::Var(index) => format!("vars[{index}]"),
        Expr::Field {
            object,
            selector,
            args,
        } => {
            let owner = object
                .map(|object| format!("obj{object}."))
                .unwrap_or_default();
            let args: Vec<String> = args.iter().map(format_expr).collect();
            format!("{owner}field{selector:#x}({})", args.join(", "))
        }
    }
}
