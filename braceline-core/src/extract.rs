//! Function extraction into standalone module files
//!
//! Global invariants enforced:
//! - Modules and functions keep manifest order
//! - A function that cannot be located is recorded as a miss, never dropped
//! - Extracted text is the verbatim source lines of each range
//!
//! Writing files is left to the caller; this module only plans and renders.

use crate::error::LocateError;
use crate::locate::{locate_block, resolve_anchor, AnchorQuery, BlockOptions, DeclarationKind};
use crate::span::BlockRange;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const BANNER_RULE: &str = "// ============================================";

const INCLUDES_COMMENT: &str = "<!-- Extracted JavaScript Modules -->";

/// One output module and the functions that belong in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    /// Output file name, e.g. `cc-utils.js`
    pub file: String,
    /// One-line summary written into the module header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function names in the order they should be written
    #[serde(default)]
    pub functions: Vec<String>,
}

/// A located function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFunction {
    pub name: String,
    pub kind: DeclarationKind,
    pub range: BlockRange,
}

/// Located functions for one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedModule {
    pub file: String,
    pub description: Option<String>,
    pub functions: Vec<ExtractedFunction>,
}

impl ExtractedModule {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// A function that could not be located
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMiss {
    pub module: String,
    pub function: String,
    pub error: LocateError,
}

/// Result of locating every function in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionPlan {
    pub modules: Vec<ExtractedModule>,
    pub misses: Vec<ExtractionMiss>,
}

impl ExtractionPlan {
    /// Every located range, in manifest order
    pub fn ranges(&self) -> Vec<BlockRange> {
        self.modules
            .iter()
            .flat_map(|m| m.functions.iter().map(|f| f.range))
            .collect()
    }

    pub fn located_count(&self) -> usize {
        self.modules.iter().map(|m| m.functions.len()).sum()
    }

    /// True when every manifest entry was located
    pub fn is_complete(&self) -> bool {
        self.misses.is_empty()
    }
}

/// Locate every function named in `modules`
///
/// Each name is looked up across the whole source (a `function` declaration
/// anywhere beats a variable declaration), then its block is located with
/// `options`.
pub fn plan_extraction<S: AsRef<str>>(
    lines: &[S],
    modules: &[ModuleSpec],
    options: &BlockOptions,
) -> ExtractionPlan {
    let mut plan = ExtractionPlan::default();

    for spec in modules {
        let mut module = ExtractedModule {
            file: spec.file.clone(),
            description: spec.description.clone(),
            functions: Vec::new(),
        };

        for name in &spec.functions {
            match locate_named(lines, name, options) {
                Ok(function) => {
                    info!(module = %spec.file, function = %name, range = %function.range, "located function");
                    module.functions.push(function);
                }
                Err(error) => {
                    warn!(module = %spec.file, function = %name, %error, "could not locate function");
                    plan.misses.push(ExtractionMiss {
                        module: spec.file.clone(),
                        function: name.clone(),
                        error,
                    });
                }
            }
        }

        plan.modules.push(module);
    }

    plan
}

fn locate_named<S: AsRef<str>>(
    lines: &[S],
    name: &str,
    options: &BlockOptions,
) -> Result<ExtractedFunction, LocateError> {
    let anchor = resolve_anchor(lines, &AnchorQuery::anywhere(name, lines.len()))?;
    let range = locate_block(lines, anchor.line, options)?;
    Ok(ExtractedFunction {
        name: name.to_string(),
        kind: anchor.kind,
        range,
    })
}

/// Render a module file from its located functions
///
/// `source_label` names the file the functions came from in the header.
/// Returns `None` if a range no longer fits inside `lines`.
pub fn render_module<S: AsRef<str>>(
    lines: &[S],
    module: &ExtractedModule,
    source_label: &str,
) -> Option<String> {
    let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();

    let mut output = String::new();
    output.push_str("/**\n");
    output.push_str(&format!(" * {}\n", module.file));
    if let Some(description) = &module.description {
        output.push_str(&format!(" * {}\n", description));
    }
    output.push_str(&format!(" * Extracted from {}\n", source_label));
    output.push_str(&format!(" * Functions: {}\n", names.join(", ")));
    output.push_str(" */\n\n");

    for function in &module.functions {
        output.push_str(BANNER_RULE);
        output.push('\n');
        output.push_str(&format!("// {} (lines {})\n", function.name, function.range));
        output.push_str(BANNER_RULE);
        output.push_str("\n\n");

        for line in function.range.slice(lines)? {
            output.push_str(line);
            output.push('\n');
        }

        output.push_str("\n\n");
    }

    Some(output)
}

/// First inline `<script>` opening tag, 1-indexed
///
/// Tags with a `src` attribute load an external file and are skipped.
pub fn find_script_tag<S: AsRef<str>>(lines: &[S]) -> Option<usize> {
    lines
        .iter()
        .position(|line| {
            let tag = line.as_ref().trim_start();
            tag.starts_with("<script") && !tag.contains("src=")
        })
        .map(|idx| idx + 1)
}

/// Script tags loading every non-empty module, in manifest order
///
/// `src_prefix` is joined to each module file with a `/`. The block is
/// framed by blank lines and a comment, and each line starts with `indent`.
/// Returns no lines when nothing was located.
pub fn render_includes(plan: &ExtractionPlan, src_prefix: &str, indent: &str) -> Vec<String> {
    let prefix = src_prefix.trim_end_matches('/');
    let tags: Vec<String> = plan
        .modules
        .iter()
        .filter(|m| !m.is_empty())
        .map(|m| {
            let src = if prefix.is_empty() {
                m.file.clone()
            } else {
                format!("{}/{}", prefix, m.file)
            };
            format!("{}<script src=\"{}\"></script>", indent, src)
        })
        .collect();

    if tags.is_empty() {
        return tags;
    }

    let mut lines = Vec::with_capacity(tags.len() + 3);
    lines.push(String::new());
    lines.push(format!("{}{}", indent, INCLUDES_COMMENT));
    lines.extend(tags);
    lines.push(String::new());
    lines
}
