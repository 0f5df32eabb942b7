//! Graft CLI - tools for working with graft documents
//!
//! Commands:
//!   graft extensions        - List the built-in extensions
//!   graft env -e a,b        - Compose extensions and show the result
//!   graft inspect <file>    - Show what a document requires
//!   graft normalize <file>  - Load a document and write it back out

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use graft::{net, Codec, Composer, Limits};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graft")]
#[command(about = "Tools for working with graft documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log extension composition and decoding
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Deepest value nesting accepted
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Reject opaque blobs
    #[arg(long, global = true)]
    no_opaque: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the extensions in the catalog
    Extensions,

    /// Compose extensions over the base environment
    Env {
        /// Extensions to compose, comma separated
        #[arg(long, short, value_delimiter = ',')]
        extensions: Vec<String>,
    },

    /// Show the extensions and tags a document uses
    Inspect {
        /// Path to the document
        file: PathBuf,

        /// Output the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a document and encode it again
    Normalize {
        /// Path to the document
        file: PathBuf,

        /// Extensions to compose in addition to those the document requires
        #[arg(long, short, value_delimiter = ',')]
        extensions: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("GRAFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let defaults = Limits::default();
    let limits = Limits {
        max_depth: cli.max_depth.unwrap_or(defaults.max_depth),
        allow_opaque: !cli.no_opaque,
    };
    let codec = Codec::default().with_limits(limits);

    match cli.command {
        Commands::Extensions => extensions_command(codec.composer()),
        Commands::Env { extensions } => env_command(codec.composer(), &extensions),
        Commands::Inspect { file, json } => inspect_command(&codec, &file, json),
        Commands::Normalize { file, extensions } => normalize_command(&codec, &file, &extensions),
    }
}

fn extensions_command(composer: &Composer) -> anyhow::Result<()> {
    let catalog = composer.catalog();
    for ext in catalog.iter() {
        println!("{}", catalog.canonical(ext.name()));
        print_list("depends", &ext.depends());
        print_list("conflicts", &ext.conflicts());
        print_list("tags", &ext.tags());
    }
    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    if !items.is_empty() {
        println!("  {}: {}", label, items.join(", "));
    }
}

fn env_command(composer: &Composer, extensions: &[String]) -> anyhow::Result<()> {
    let env = composer
        .compose(extensions, &net::environment())
        .context("Failed to compose extensions")?;

    println!("provenance: [{}]", env.provenance().join(", "));
    println!("fingerprint: {}", env.fingerprint().to_hex());
    println!("types:");
    for ty in env.types() {
        if ty.provenance().is_empty() {
            println!("  {} <{}>", ty.name(), ty.tag());
        } else {
            println!("  {} <{}> [{}]", ty.name(), ty.tag(), ty.provenance().join(", "));
        }
    }
    Ok(())
}

fn read_document(file: &Path) -> anyhow::Result<graft::Tree> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    graft_tree::parse(&text).with_context(|| format!("Failed to parse {}", file.display()))
}

fn inspect_command(codec: &Codec, file: &Path, json: bool) -> anyhow::Result<()> {
    let tree = read_document(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    let required = codec.required_extensions(&tree)?;
    let tags: BTreeSet<&str> = tree.nodes().map(|node| node.tag.as_str()).collect();
    println!("extensions: [{}]", required.join(", "));
    println!("tags: [{}]", tags.into_iter().collect::<Vec<_>>().join(", "));
    Ok(())
}

fn normalize_command(codec: &Codec, file: &Path, extensions: &[String]) -> anyhow::Result<()> {
    let tree = read_document(file)?;
    let value = codec
        .decode(&tree, extensions)
        .with_context(|| format!("Failed to decode {}", file.display()))?;
    print!("{}", codec.dumps(&value)?);
    Ok(())
}
