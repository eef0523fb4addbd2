//! unflat CLI - rebuild structured documents from layout-model page dumps

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use unflat::{
    detect, load_pages, DocumentKind, DocumentProfile, JsonFormat, ReconstructOptions, Unflat, NOT_A_TITLE,
};

#[derive(Parser)]
#[command(name = "unflat")]
#[command(version)]
#[command(about = "Rebuild Markdown and document trees from layout-model page JSON", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Downgrade broken table contracts to warnings
    #[arg(long, global = true, env = "UNFLAT_LENIENT")]
    lenient: bool,

    /// Keep table blocks as plain text
    #[arg(long, global = true)]
    no_tables: bool,

    /// Document kind, detected from the text when omitted
    #[arg(long, global = true, value_enum)]
    kind: Option<KindArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render pages JSON as Markdown
    #[command(alias = "md")]
    Markdown {
        /// Input pages JSON
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Render pages JSON as a document tree
    Tree {
        /// Input pages JSON
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Document name recorded in the tree (file stem if not specified)
        #[arg(long)]
        name: Option<String>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Convert many pages JSON files in parallel
    Batch {
        /// Input pages JSON files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "markdown")]
        format: BatchFormat,
    },

    /// Show the detected profile and heading levels
    Inspect {
        /// Input pages JSON
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the profile and levels as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Book,
    DrugInstruction,
    Guideline,
    Unknown,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Book => DocumentKind::Book,
            KindArg::DrugInstruction => DocumentKind::DrugInstruction,
            KindArg::Guideline => DocumentKind::Guideline,
            KindArg::Unknown => DocumentKind::Unknown,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BatchFormat {
    /// Markdown (.md)
    Markdown,
    /// Document tree JSON (.json)
    Tree,
}

impl BatchFormat {
    fn extension(self) -> &'static str {
        match self {
            BatchFormat::Markdown => "md",
            BatchFormat::Tree => "json",
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let builder = builder_from(&cli);

    let result = match &cli.command {
        Commands::Markdown { input, output } => cmd_markdown(&builder, input, output.as_deref()),
        Commands::Tree {
            input,
            name,
            compact,
            output,
        } => cmd_tree(&builder, input, name.as_deref(), *compact, output.as_deref()),
        Commands::Batch {
            inputs,
            output,
            format,
        } => cmd_batch(&builder, inputs, output, *format),
        Commands::Inspect { input, json } => cmd_inspect(&builder, input, *json),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn builder_from(cli: &Cli) -> Unflat {
    let mut builder = Unflat::new();
    if cli.lenient {
        builder = builder.lenient();
    }
    if cli.no_tables {
        builder = builder.without_tables();
    }
    if let Some(kind) = cli.kind {
        builder = builder.with_document_kind(kind.into());
    }
    builder
}

fn write_or_print(output: Option<&Path>, content: &str) -> CliResult {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_markdown(builder: &Unflat, input: &Path, output: Option<&Path>) -> CliResult {
    let markdown = builder.reconstruct_file(input)?.to_markdown();
    write_or_print(output, &markdown)
}

fn cmd_tree(builder: &Unflat, input: &Path, name: Option<&str>, compact: bool, output: Option<&Path>) -> CliResult {
    let mut reconstruction = builder.reconstruct_file(input)?;
    if let Some(name) = name {
        reconstruction.name = name.to_string();
    }

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = reconstruction.to_json(format)?;
    write_or_print(output, &json)
}

fn render_one(builder: &Unflat, input: &Path, output_dir: &Path, format: BatchFormat) -> unflat::Result<PathBuf> {
    let reconstruction = builder.reconstruct_file(input)?;
    let content = match format {
        BatchFormat::Markdown => reconstruction.to_markdown(),
        BatchFormat::Tree => reconstruction.to_json(JsonFormat::Pretty)?,
    };
    let target = output_dir.join(format!("{}.{}", reconstruction.name, format.extension()));
    fs::write(&target, content)?;
    Ok(target)
}

fn cmd_batch(builder: &Unflat, inputs: &[PathBuf], output_dir: &Path, format: BatchFormat) -> CliResult {
    fs::create_dir_all(output_dir)?;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let failures: Vec<(PathBuf, unflat::Error)> = inputs
        .par_iter()
        .filter_map(|input| {
            let result = render_one(builder, input, output_dir, format);
            pb.inc(1);
            match result {
                Ok(target) => {
                    pb.set_message(target.display().to_string());
                    None
                }
                Err(e) => Some((input.clone(), e)),
            }
        })
        .collect();

    pb.finish_with_message("Done!");

    let converted = inputs.len() - failures.len();
    println!("\n{} {} of {} files converted", "Done!".green().bold(), converted, inputs.len());
    for (input, error) in &failures {
        eprintln!("  {} {}: {}", "✗".red(), input.display(), error);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} files failed", failures.len()).into())
    }
}

fn cmd_inspect(builder: &Unflat, input: &Path, json: bool) -> CliResult {
    let pages = load_pages(input)?;
    let options: &ReconstructOptions = builder.options();
    let detected = detect::classify(&pages);
    let profile = DocumentProfile {
        language: options.language.unwrap_or(detected.language),
        kind: options.document_kind.unwrap_or(detected.kind),
    };
    let reconstruction = builder.reconstruct(
        input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
        &pages,
    )?;

    if json {
        let levels: Vec<serde_json::Value> = reconstruction
            .structure
            .iter()
            .filter(|el| el.is_heading())
            .map(|el| {
                serde_json::json!({
                    "id": el.id(),
                    "level": el.title_level,
                    "slot": el.slot.map(|s| s.name()),
                    "text": el.text,
                })
            })
            .collect();
        let report = serde_json::json!({
            "file": input.display().to_string(),
            "pages": pages.len(),
            "profile": profile,
            "headings": levels,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Document Profile".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), pages.len());
    println!("{}: {}", "Language".bold(), profile.language);
    println!("{}: {}", "Kind".bold(), profile.kind);

    println!();
    println!("{}", "Elements".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for el in reconstruction.structure.iter() {
        let level = if el.title_level == NOT_A_TITLE {
            "  -".dimmed()
        } else {
            format!("{:>3}", el.title_level).green().bold()
        };
        let slot = el.slot.map_or_else(|| "-".to_string(), |s| s.name().to_string());
        let text: String = el.text.chars().take(60).collect();
        let line = format!("{} {:<10} {:<12} {}", level, el.id(), el.role.label(), text);
        if el.informative {
            println!("{}  {}", line, slot.dimmed());
        } else {
            println!("{}", line.dimmed());
        }
    }

    let headings = reconstruction.structure.iter().filter(|el| el.is_heading()).count();
    println!();
    println!("{}: {}", "Headings".bold(), headings);
    println!("{}: {}", "Tree nodes".bold(), reconstruction.to_tree().node_count());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGES: &str = r#"[{
        "pnum": 0,
        "bbox": [0, 0, 600, 800],
        "blocks": [
            {"role_label": "doc_title", "pnum": 0, "bbox": [50, 40, 550, 60],
             "lines": [{"bbox": [50, 40, 550, 60], "spans": [{"text": "第一章 绪论", "bbox": [50, 40, 550, 60]}]}]},
            {"role_label": "text", "pnum": 0, "bbox": [50, 80, 550, 100],
             "lines": [{"bbox": [50, 80, 550, 100], "spans": [{"text": "糖尿病是一组以高血糖为特征的代谢性疾病。", "bbox": [50, 80, 550, 100]}]}]}
        ]
    }]"#;

    #[test]
    fn test_render_one_writes_named_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("guide.json");
        fs::write(&input, PAGES).unwrap();

        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();

        let target = render_one(&Unflat::new(), &input, &out, BatchFormat::Markdown).unwrap();
        assert_eq!(target, out.join("guide.md"));
        let markdown = fs::read_to_string(&target).unwrap();
        assert!(markdown.starts_with("# 第一章 绪论"));

        let target = render_one(&Unflat::new(), &input, &out, BatchFormat::Tree).unwrap();
        assert_eq!(target, out.join("guide.json"));
        assert!(fs::read_to_string(&target).unwrap().contains("\"file_name\": \"guide\""));
    }

    #[test]
    fn test_kind_flag_maps_to_document_kind() {
        let cli = Cli::parse_from(["unflat", "--kind", "drug-instruction", "--lenient", "inspect", "a.json"]);
        let builder = builder_from(&cli);
        assert_eq!(builder.options().document_kind, Some(DocumentKind::DrugInstruction));
        assert_eq!(builder.options().error_mode, unflat::ErrorMode::Lenient);
    }
}
