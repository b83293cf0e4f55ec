use clap::{Parser, Subcommand};
use pixjoin::container::{self, ArchiveView, JoinOptions};
use pixjoin::{FormatVersion, Item, PixelCodec, PngSurface};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pixjoin", about = "Join typed items into one archive and hide byte streams in PNG pixels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join files and inline values into one archive
    Join {
        #[arg(short, long)]
        output: PathBuf,
        /// Files stored as `file` items
        #[arg(short, long, num_args = 1..)]
        input: Vec<PathBuf>,
        /// MIME type recorded for every input file
        #[arg(long, default_value = "")]
        mime: String,
        /// Inline text item, `name=value`
        #[arg(long = "string", value_name = "NAME=VALUE")]
        strings: Vec<String>,
        /// Inline JSON item, `name=json`
        #[arg(long = "json", value_name = "NAME=JSON")]
        objects: Vec<String>,
        /// Write the pre-versioned bare-array layout
        #[arg(long)]
        legacy: bool,
    },
    /// Extract archive items into a directory
    Split {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Only extract items with these names
        #[arg(short, long)]
        name: Vec<String>,
    },
    /// List archive items
    List {
        input: PathBuf,
    },
    /// Show archive metadata
    Info {
        input: PathBuf,
    },
    /// Hide a file inside the pixels of a PNG image
    Encode {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Filename embedded in the image (defaults to the input's name)
        #[arg(short, long)]
        filename: Option<String>,
    },
    /// Recover the file hidden in a PNG image
    Decode {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {

        // ── Join ─────────────────────────────────────────────────────────────
        Commands::Join { output, input, mime, strings, objects, legacy } => {
            let mut items = Vec::new();
            for path in &input {
                items.push(Item::file(file_name(path), mime.clone(), std::fs::read(path)?));
            }
            for pair in &strings {
                let (name, value) = split_pair(pair)?;
                items.push(Item::string(name, value));
            }
            for pair in &objects {
                let (name, json) = split_pair(pair)?;
                items.push(Item::json(name, serde_json::from_str(json)?));
            }

            let opts = JoinOptions {
                version: if legacy { FormatVersion::LegacyArray } else { FormatVersion::current() },
                ..JoinOptions::default()
            };
            std::fs::write(&output, container::join_with(&items, &opts)?)?;
            println!("Joined {} item(s) into {}", items.len(), output.display());
        }

        // ── Split ────────────────────────────────────────────────────────────
        Commands::Split { input, output_dir, name } => {
            let buffer = std::fs::read(&input)?;
            let view   = ArchiveView::open(&buffer)?;
            if !output_dir.exists() { std::fs::create_dir_all(&output_dir)?; }

            let names: Vec<&str> = name.iter().map(String::as_str).collect();
            let filter = (!names.is_empty()).then_some(names.as_slice());
            for item in view.split(filter)? {
                let dest = output_dir.join(safe_name(item.name(), "item.bin"));
                match &item {
                    Item::File { bytes, .. } | Item::Blob { bytes, .. } => std::fs::write(&dest, bytes)?,
                    Item::String { value, .. } => std::fs::write(&dest, value)?,
                    Item::Object { value, .. } => std::fs::write(&dest, serde_json::to_vec_pretty(value)?)?,
                }
                println!("  extracted  {} ({})", dest.display(), item.kind());
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let buffer = std::fs::read(&input)?;
            let view   = ArchiveView::open(&buffer)?;
            println!("Archive: {}", input.display());
            println!("{:<26} {:>7} {:>12} {:>12}  MIME", "Name", "Kind", "Size", "Offset");
            for d in &view.metadata().descriptors {
                println!("{:<26} {:>7} {:>12} {:>12}  {}",
                    d.name, d.kind, d.size, d.start,
                    d.mime_type.as_deref().unwrap_or("—"));
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let buffer = std::fs::read(&input)?;
            let meta   = container::parse_metadata(&buffer)?;
            let layout = match &meta.version {
                FormatVersion::LegacyArray => "legacy array",
                FormatVersion::Unversioned => "unversioned object",
                FormatVersion::Tagged(_)   => "versioned object",
            };

            println!("── Joined archive ───────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Layout         {layout}");
            println!("  Version        {}", meta.version.tag());
            println!("  Checksum       {}", if meta.checksum.is_empty() { "—" } else { meta.checksum.as_str() });
            println!("  Items          {}", meta.descriptors.len());
            println!("  Payload        {} B", meta.payload_len());
            println!("  Buffer         {} B", buffer.len());
        }

        // ── Encode ───────────────────────────────────────────────────────────
        Commands::Encode { input, output, filename } => {
            let file = pixjoin::NamedFile::new(file_name(&input), "", std::fs::read(&input)?);
            let mut surface = PngSurface::new();
            let image = PixelCodec::default().encode_file(&mut surface, &file, filename.as_deref())?;
            let dest = output.unwrap_or_else(|| input.with_file_name(&image.name));
            std::fs::write(&dest, &image.bytes)?;
            println!("Encoded → {}", dest.display());
        }

        // ── Decode ───────────────────────────────────────────────────────────
        Commands::Decode { input, output_dir } => {
            let mut surface = PngSurface::new();
            let file = PixelCodec::default().decode_file(&mut surface, &std::fs::read(&input)?)?;
            if !output_dir.exists() { std::fs::create_dir_all(&output_dir)?; }
            let dest = output_dir.join(safe_name(&file.name, "decoded.bin"));
            std::fs::write(&dest, &file.bytes)?;
            println!("Decoded {} B → {}", file.bytes.len(), dest.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Final path component of a stored name; stored names are untrusted.
fn safe_name<'a>(name: &'a str, fallback: &'a str) -> &'a OsStr {
    Path::new(name).file_name().unwrap_or(OsStr::new(fallback))
}

fn split_pair(pair: &str) -> Result<(&str, &str), Box<dyn std::error::Error>> {
    pair.split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{pair}'").into())
}
