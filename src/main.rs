use clap::{Parser, Subcommand};
use pakindex::codec::CodecId;
use pakindex::container::{ContainerWriter, PackOptions, PakReader, DEFAULT_COMPRESSION_LEVEL};
use pakindex::reader::ArchiveReader;
use pakindex::{ArchiveKey, ArchiveSession, LoadedArchives, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pakindex", about = "Browse many encrypted archive containers as one tree")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where to load containers from.  Flags override the config file.
#[derive(clap::Args)]
struct LoadArgs {
    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding the containers
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// Shared key: 0x-prefixed 64 hex digits, or a passphrase
    #[arg(short, long)]
    key: Option<String>,
    /// Container extension
    #[arg(short, long)]
    extension: Option<String>,
    /// Open containers one at a time
    #[arg(long)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack files and directories into one container
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// Codec: zstd (default), lz4, brotli, lzma, none
        #[arg(short, long, default_value = "zstd")]
        codec: String,
        #[arg(short, long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        level: i32,
        /// Encrypt with this key
        #[arg(short, long)]
        key: Option<String>,
        /// Directory prefix for every packed entry (e.g. "Game/Content")
        #[arg(short, long)]
        base: Option<String>,
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Show one container's header and key status
    Info {
        input: PathBuf,
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Load every container and print the directory tree
    Tree {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Load every container and list one directory
    Ls {
        directory: String,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Load every container and resolve one entry by directory and name
    Resolve {
        directory: String,
        /// Display name, or full file name with --exact
        name: String,
        /// Match the full file name including extension
        #[arg(long)]
        exact: bool,
        #[command(flatten)]
        load: LoadArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, codec, level, key, base, input } => {
            let options = PackOptions {
                codec: parse_codec(&codec),
                level,
                key: key.as_deref().map(str::parse::<ArchiveKey>).transpose()?,
            };
            let mut writer = ContainerWriter::create(&output, options)?;
            let prefix = base.unwrap_or_default();
            for root in &input {
                for (file, relative) in collect_inputs(root)? {
                    let data = std::fs::read(&file)?;
                    let entry_path = format!("{prefix}/{relative}");
                    writer.add_entry(&entry_path, &data)?;
                    println!("  packed  {}", file.display());
                }
            }
            writer.finalize()?;
            println!("Created: {}", output.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, key } => {
            let mut reader = PakReader::open(&input)?;
            let header = reader.header().clone();
            println!("── Container ────────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Version        {}", header.version);
            println!("  UUID           {}", header.uuid);
            println!("  Encrypted      {}", header.is_encrypted());
            if let Some(created) = header.created_at() {
                println!("  Created        {}", created.to_rfc3339());
            }
            println!("  Index offset   {} B", header.index_offset);
            println!("  Index size     {} B", header.index_size);
            if let Some(key) = key {
                let key: ArchiveKey = key.parse()?;
                let accepted = reader.test_key(&key);
                println!("  Key accepted   {accepted}");
                if accepted {
                    reader.set_key(&key)?;
                }
            }
            match reader.records() {
                Some(records) => {
                    let stored: u64 = records.iter().map(|r| r.stored_size).sum();
                    let original: u64 = records.iter().map(|r| r.original_size).sum();
                    println!("  Entries        {}", records.len());
                    println!("  Size           {original} B ({stored} B stored)");
                }
                None => println!("  Entries        (locked)"),
            }
        }

        // ── Tree ─────────────────────────────────────────────────────────────
        Commands::Tree { load } => {
            let loaded = load_all(load)?;
            loaded.tree().walk(|node, depth| {
                println!("{:indent$}{}/", "", node.name(), indent = depth * 2);
            });
        }

        // ── Ls ───────────────────────────────────────────────────────────────
        Commands::Ls { directory, load } => {
            let loaded = load_all(load)?;
            for entry in loaded.index().list_directory(&directory) {
                println!("{:<40} {:>12}  {}", entry.display_name(), entry.size(), entry.name());
            }
        }

        // ── Resolve ──────────────────────────────────────────────────────────
        Commands::Resolve { directory, name, exact, load } => {
            let loaded = load_all(load)?;
            let index = loaded.index();
            let entry = if exact {
                index.resolve_file(&directory, &name)?
            } else {
                index.resolve_entry(&directory, &name)?
            };
            let data = loaded.read_entry(entry)?;
            let container = loaded.reader(entry.container())
                .map(|r| r.name().to_owned())
                .unwrap_or_else(|| entry.container().to_string());
            println!("  Path           {}", entry.path());
            println!("  Container      {container}");
            println!("  Size           {} B", data.len());
            println!("  BLAKE3         {}", blake3::hash(&data).to_hex());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_all(args: LoadArgs) -> Result<Arc<LoadedArchives>, Box<dyn std::error::Error>> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None       => Settings::default(),
    };
    if let Some(dir) = args.dir { settings.archive_dir = dir; }
    if let Some(key) = args.key { settings.key = Some(key); }
    if let Some(ext) = args.extension { settings.extension = ext; }
    if args.sequential { settings.parallel = false; }

    let session = ArchiveSession::with_pak_containers(settings);
    let loaded = session.load_all()?;
    for skipped in &loaded.report().skipped {
        eprintln!("  skipped {} ({})", skipped.path.display(), skipped.reason);
    }
    Ok(loaded)
}

/// Files under `root` paired with their entry path relative to `root`'s parent
/// (a plain file maps to its own name).
fn collect_inputs(root: &Path) -> std::io::Result<Vec<(PathBuf, String)>> {
    fn walk(dir: &Path, prefix: &str, out: &mut Vec<(PathBuf, String)>) -> std::io::Result<()> {
        let mut children: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
        children.sort_by_key(|e| e.file_name());
        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let relative = format!("{prefix}/{name}");
            if child.file_type()?.is_dir() {
                walk(&child.path(), &relative, out)?;
            } else {
                out.push((child.path(), relative));
            }
        }
        Ok(())
    }

    let name = root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut out = Vec::new();
    if root.is_dir() {
        walk(root, &name, &mut out)?;
    } else {
        out.push((root.to_owned(), name));
    }
    Ok(out)
}

fn parse_codec(s: &str) -> CodecId {
    CodecId::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown codec '{}', defaulting to zstd", s);
        CodecId::Zstd
    })
}
