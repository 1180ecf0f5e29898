//! Logging and debugging facilities for Lattice Storage.
//!
//! This module provides:
//! - Span and target names for filtering `tracing` output by subsystem
//! - A tree formatter used to dump storage hierarchies in a readable form
//! - [`PerfSpan`] for timing bulk operations
//!
//! # Tracing Integration
//!
//! Lattice Storage uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_storage=debug")
//!     .init();
//! ```

use std::fmt::Write as FmtWrite;

/// Span names used throughout Lattice Storage for tracing.
pub mod span_names {
    /// Signal emission span.
    pub const SIGNAL: &str = "lattice_storage::signal";
    /// Bulk load of a configuration snapshot.
    pub const LOAD: &str = "lattice_storage::load";
    /// Bulk save of a configuration snapshot.
    pub const SAVE: &str = "lattice_storage::save";
    /// Controller bus change cascade.
    pub const BUS_CHANGE: &str = "lattice_storage::bus_change";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core target.
    pub const CORE: &str = "lattice_storage_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "lattice_storage_core::signal";
    /// Storage tree model target.
    pub const MODEL: &str = "lattice_storage::model";
    /// Settings editor target.
    pub const EDITOR: &str = "lattice_storage::editor";
    /// Platform profile loading target.
    pub const CONFIG: &str = "lattice_storage::config";
    /// Medium cache target.
    pub const MEDIUM: &str = "lattice_storage::medium";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node IDs.
    pub show_ids: bool,
    /// Whether to show node kinds.
    pub show_types: bool,
    /// Whether to show per-node properties.
    pub show_properties: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_types: true,
            show_properties: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_properties: true,
            ..Default::default()
        }
    }

    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_types: false,
            show_properties: false,
            ..Default::default()
        }
    }
}

/// One node of a tree to be formatted.
///
/// Producers flatten their hierarchy depth-first into a list of these.
#[derive(Debug, Clone, Default)]
pub struct TreeLine {
    /// Distance from the top of the dump.
    pub depth: usize,
    /// Whether this node is the last child of its parent.
    pub is_last: bool,
    /// Human-readable label.
    pub label: String,
    /// Opaque identifier, shown when `show_ids` is set.
    pub id: Option<String>,
    /// Node kind, shown when `show_types` is set.
    pub kind: Option<&'static str>,
    /// Key/value pairs, shown when `show_properties` is set.
    pub properties: Vec<(&'static str, String)>,
}

/// Formats flattened trees according to [`TreeFormatOptions`].
#[derive(Debug, Clone, Default)]
pub struct TreeFormatter {
    options: TreeFormatOptions,
}

impl TreeFormatter {
    /// Create a formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &TreeFormatOptions {
        &self.options
    }

    /// Render a titled tree.
    pub fn format(&self, title: &str, lines: &[TreeLine]) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{title}");

        if lines.is_empty() {
            let _ = writeln!(output, "  (empty)");
            return output;
        }

        for line in lines {
            if self.options.max_depth.is_some_and(|max| line.depth > max) {
                continue;
            }
            self.format_line_into(line, &mut output);
        }
        output
    }

    fn format_line_into(&self, line: &TreeLine, output: &mut String) {
        output.push_str(&self.build_prefix(line.depth, line.is_last));
        output.push_str(if line.label.is_empty() { "(unnamed)" } else { &line.label });

        if self.options.show_ids {
            if let Some(id) = &line.id {
                let _ = write!(output, " [{id}]");
            }
        }
        if self.options.show_types {
            if let Some(kind) = line.kind {
                let _ = write!(output, " ({kind})");
            }
        }
        output.push('\n');

        if self.options.show_properties {
            let prefix = self.build_property_prefix(line.depth);
            for (key, value) in &line.properties {
                let _ = writeln!(output, "{prefix}  .{key} = {value}");
            }
        }
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }

    /// Build the prefix for property lines.
    fn build_property_prefix(&self, depth: usize) -> String {
        let branch = match self.options.style {
            TreeStyle::Ascii => "|",
            TreeStyle::Unicode => "\u{2502}",
            TreeStyle::Compact => "",
        };

        let mut prefix = String::new();
        for _ in 0..depth {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to time bulk operations such as snapshot loads.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "lattice_storage::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
