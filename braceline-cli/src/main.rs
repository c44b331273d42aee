//! Braceline CLI - locate, trace, extract and strip JavaScript function blocks

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Results go to stdout, logs to stderr
// - A block that cannot be located is never written, extracted, or stripped

mod telemetry;

use anyhow::Context;
use braceline_core::config::{self, ResolvedConfig};
use braceline_core::extract::{find_script_tag, plan_extraction, render_includes, render_module};
use braceline_core::report::{render_plan, render_profile, render_trace};
use braceline_core::splice::{merge_ranges, strip_and_insert, strip_ranges};
use braceline_core::trace::{nesting_profile, trace_block};
use braceline_core::{
    load_source, locate_block, render_json, render_text, resolve_anchor, write_lines, AnchorQuery,
    BlockRange, EscapeRule, LocateReport,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "braceline")]
#[command(about = "Locate brace-delimited JavaScript blocks by line, ignoring strings and comments")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the line range of blocks by anchor line or function name
    Locate {
        /// Source file (HTML or JavaScript)
        file: PathBuf,

        /// Anchor line of a block (repeatable)
        #[arg(long = "line")]
        lines: Vec<usize>,

        /// Function name to resolve (repeatable)
        #[arg(long = "function")]
        functions: Vec<String>,

        /// Approximate declaration line for --function (default: search whole file)
        #[arg(long)]
        near: Option<usize>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Show the depth change on every line of a block scan
    Trace {
        /// Source file (HTML or JavaScript)
        file: PathBuf,

        /// Anchor line of the block
        #[arg(long, conflicts_with = "function", required_unless_present = "function")]
        line: Option<usize>,

        /// Function name to resolve
        #[arg(long)]
        function: Option<String>,

        /// Approximate declaration line for --function (default: search whole file)
        #[arg(long)]
        near: Option<usize>,

        /// Expected end line; exits non-zero on mismatch
        #[arg(long)]
        expect: Option<usize>,

        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Show depth changes between two lines
    Profile {
        /// Source file (HTML or JavaScript)
        file: PathBuf,

        /// First line to scan
        #[arg(long)]
        from: usize,

        /// Line whose entering depth is reported (not scanned)
        #[arg(long)]
        to: usize,

        /// Depth before the first line
        #[arg(long, default_value = "0")]
        start_depth: i64,

        /// Only list changes landing on this depth (repeatable)
        #[arg(long = "level")]
        levels: Vec<i64>,

        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Extract the functions listed in the config's modules into files
    Extract {
        /// Source file (HTML or JavaScript)
        file: PathBuf,

        /// Directory the module files are written to
        #[arg(long)]
        out_dir: PathBuf,

        /// Report what would be extracted without writing files
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Write a copy of the source with line ranges removed
    Strip {
        /// Source file (HTML or JavaScript)
        file: PathBuf,

        /// Output file
        #[arg(long)]
        output: PathBuf,

        /// Range to remove as START-END, 1-indexed inclusive (repeatable)
        #[arg(long = "range")]
        ranges: Vec<String>,

        /// Also remove every function listed in the config's modules and
        /// load the module files in their place
        #[arg(long)]
        extracted: bool,

        /// Path prefix for the inserted module `<script src>` tags
        #[arg(long, default_value = "")]
        src_prefix: String,

        /// Line the module includes go before (default: first inline <script>)
        #[arg(long)]
        insert_at: Option<usize>,

        /// Do not insert module includes with --extracted
        #[arg(long)]
        no_includes: bool,

        #[command(flatten)]
        scan: ScanArgs,
    },
}

/// Scan settings shared by every subcommand; flags override the config file
#[derive(clap::Args)]
struct ScanArgs {
    /// Path to config file (default: nearest one above the source file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Depth considered outside the block, e.g. 1 inside a wrapper
    #[arg(long)]
    baseline: Option<i64>,

    /// Maximum lines a block scan may examine
    #[arg(long)]
    max_lines: Option<usize>,

    /// Lines searched on each side of --near
    #[arg(long)]
    window: Option<usize>,

    /// Escape handling before quotes and backticks
    #[arg(long)]
    escapes: Option<EscapeArg>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum EscapeArg {
    SingleLookback,
    CountBackslashes,
}

impl From<EscapeArg> for EscapeRule {
    fn from(arg: EscapeArg) -> Self {
        match arg {
            EscapeArg::SingleLookback => EscapeRule::SingleLookback,
            EscapeArg::CountBackslashes => EscapeRule::CountBackslashes,
        }
    }
}

impl ScanArgs {
    /// Load config for `file` and apply flag overrides
    fn resolve(&self, file: &Path) -> anyhow::Result<ResolvedConfig> {
        let source = file
            .canonicalize()
            .with_context(|| format!("Failed to read file: {}", file.display()))?;
        let source_dir = source.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut resolved = config::load_and_resolve(&source_dir, self.config.as_deref())?;
        if let Some(path) = &resolved.config_path {
            info!(path = %path.display(), "using config");
        }
        self.apply(&mut resolved)?;
        Ok(resolved)
    }

    fn apply(&self, resolved: &mut ResolvedConfig) -> anyhow::Result<()> {
        if let Some(baseline) = self.baseline {
            if baseline < 0 {
                anyhow::bail!("--baseline must be non-negative (got {})", baseline);
            }
            resolved.block.baseline_depth = baseline;
        }
        if let Some(max_lines) = self.max_lines {
            if max_lines == 0 {
                anyhow::bail!("--max-lines must be at least 1");
            }
            resolved.block.max_lines = max_lines;
        }
        if let Some(window) = self.window {
            resolved.search_window = window;
        }
        if let Some(escapes) = self.escapes {
            resolved.block.scan.escapes = escapes.into();
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::initialise(cli.verbose)?;

    match cli.command {
        Commands::Locate {
            file,
            lines,
            functions,
            near,
            format,
            scan,
        } => {
            if lines.is_empty() && functions.is_empty() {
                anyhow::bail!("nothing to locate: pass --line and/or --function");
            }
            let resolved = scan.resolve(&file)?;
            let source = load_source(&file)?;

            let mut reports = Vec::new();
            for line in lines {
                let outcome = locate_block(&source, line, &resolved.block);
                reports.push(LocateReport::new(format!("line {}", line), &outcome));
            }
            for name in functions {
                let query = anchor_query(&name, near, source.len(), &resolved);
                let outcome = resolve_anchor(&source, &query)
                    .and_then(|anchor| locate_block(&source, anchor.line, &resolved.block));
                reports.push(LocateReport::new(name, &outcome));
            }

            match format {
                OutputFormat::Text => print!("{}", render_text(&reports)),
                OutputFormat::Json => println!("{}", render_json(&reports)),
            }

            if reports.iter().any(|r| !r.is_ok()) {
                std::process::exit(1);
            }
        }
        Commands::Trace {
            file,
            line,
            function,
            near,
            expect,
            scan,
        } => {
            let resolved = scan.resolve(&file)?;
            let source = load_source(&file)?;

            let anchor_line = match (line, function) {
                (Some(line), _) => line,
                (None, Some(name)) => {
                    let query = anchor_query(&name, near, source.len(), &resolved);
                    resolve_anchor(&source, &query)?.line
                }
                (None, None) => anyhow::bail!("pass --line or --function"),
            };

            let trace = trace_block(&source, anchor_line, &resolved.block);
            let verification = expect.map(|expected| trace.verify(expected));
            print!("{}", render_trace(&trace, &source, verification.as_ref()));

            let failed = trace.outcome.is_err() || verification.is_some_and(|v| !v.matches);
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Profile {
            file,
            from,
            to,
            start_depth,
            levels,
            scan,
        } => {
            let resolved = scan.resolve(&file)?;
            let source = load_source(&file)?;
            let profile = nesting_profile(&source, from, to, start_depth, &resolved.block.scan)
                .context("invalid profile range")?;
            print!("{}", render_profile(&profile, &source, &levels));
        }
        Commands::Extract {
            file,
            out_dir,
            dry_run,
            scan,
        } => {
            let resolved = scan.resolve(&file)?;
            if resolved.modules.is_empty() {
                anyhow::bail!("no modules configured: add a \"modules\" list to the config file");
            }
            let source = load_source(&file)?;
            let plan = plan_extraction(&source, &resolved.modules, &resolved.block);
            print!("{}", render_plan(&plan));

            if !dry_run {
                let label = resolved.source_label_for(&file);
                std::fs::create_dir_all(&out_dir)
                    .with_context(|| format!("failed to create {}", out_dir.display()))?;

                for module in plan.modules.iter().filter(|m| !m.is_empty()) {
                    let text = render_module(&source, module, &label)
                        .context("located range no longer fits the source")?;
                    let path = out_dir.join(&module.file);
                    std::fs::write(&path, text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), functions = module.functions.len(), "wrote module");
                }
            }

            if !plan.is_complete() {
                std::process::exit(1);
            }
        }
        Commands::Strip {
            file,
            output,
            ranges,
            extracted,
            src_prefix,
            insert_at,
            no_includes,
            scan,
        } => {
            let resolved = scan.resolve(&file)?;
            let source = load_source(&file)?;

            let mut to_remove = ranges
                .iter()
                .map(|r| parse_range(r))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let mut includes = Vec::new();
            let mut insertion = None;
            if extracted {
                let plan = plan_extraction(&source, &resolved.modules, &resolved.block);
                if !plan.is_complete() {
                    eprint!("{}", render_plan(&plan));
                    anyhow::bail!("refusing to strip: {} function(s) could not be located", plan.misses.len());
                }
                to_remove.extend(plan.ranges());

                if !no_includes {
                    let line = match insert_at {
                        Some(line) => line,
                        None => find_script_tag(&source).context(
                            "no inline <script> tag to insert module includes before; pass --insert-at or --no-includes",
                        )?,
                    };
                    let indent = source
                        .get(line.saturating_sub(1))
                        .map(|l| leading_whitespace(l))
                        .unwrap_or_default();
                    includes = render_includes(&plan, &src_prefix, indent);
                    insertion = Some(line);
                }
            }
            if to_remove.is_empty() {
                anyhow::bail!("nothing to strip: pass --range and/or --extracted");
            }

            let merged = merge_ranges(&to_remove);
            let kept = match insertion {
                Some(line) => strip_and_insert(&source, &merged, line, &includes)?,
                None => strip_ranges(&source, &merged)?,
            };
            write_lines(&output, &kept)?;

            let removed: usize = merged.iter().map(|r| r.line_count()).sum();
            println!(
                "Removed {} line(s) in {} range(s), inserted {} line(s); wrote {} line(s) to {}",
                removed,
                merged.len(),
                includes.len(),
                kept.len(),
                output.display()
            );
        }
    }

    Ok(())
}

/// Query around `near`, or across the whole source when no hint is given
fn anchor_query(name: &str, near: Option<usize>, total_lines: usize, resolved: &ResolvedConfig) -> AnchorQuery {
    match near {
        Some(line) => AnchorQuery::new(name, line, resolved.search_window),
        None => AnchorQuery::anywhere(name, total_lines),
    }
}

/// Indentation of `line`, reused for inserted lines
fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Parse `START-END` into a range
fn parse_range(text: &str) -> anyhow::Result<BlockRange> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| anyhow::anyhow!("invalid range {:?}: expected START-END", text))?;
    let start: usize = start
        .trim()
        .parse()
        .with_context(|| format!("invalid range start in {:?}", text))?;
    let end: usize = end
        .trim()
        .parse()
        .with_context(|| format!("invalid range end in {:?}", text))?;
    if start == 0 || end < start {
        anyhow::bail!("invalid range {:?}: lines are 1-indexed and START <= END", text);
    }
    Ok(BlockRange::new(start, end))
}
