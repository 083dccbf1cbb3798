//! Graphviz DOT output
//!
//! Only the top level is drawn as individual nodes. Bottom packages shared
//! by several top packages collapse into one point node per set of sharers,
//! and advised packages collapse into one box per set of advisers, which
//! keeps graphs of thousands of packages readable.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use dabs_core::PackageCollection;
use dabs_core::formulas::min_max_normalize;
use tracing::debug;

use crate::colors::{AlphaMode, MixMode, Palette, copy_hue, float_to_hex, hex_to_float, mix};
use crate::error::RenderError;
use crate::types::OutputConfig;

const GRAPH_OPTIONS: [&str; 8] = [
    "overlap=prism",
    "overlap_scaling=-6",
    "smoothing=rng",
    "splines=true",
    "esep=\"+10\"",
    "start=1",
    "tooltip=\" \"",
    "node [fontname=Cantarell]",
];

const LABEL_LENGTH: usize = 40;
const LABEL_WIDTH: usize = 10;

/// Attribute value of a node or edge statement
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    /// Text
    Text(String),
    /// Number
    Number(f64),
    /// Flag
    Flag(bool),
    /// Explicitly unset, rendered as `none`
    Unset,
}

impl From<&str> for Attr {
    fn from(value: &str) -> Self {
        Attr::Text(value.to_string())
    }
}

impl From<String> for Attr {
    fn from(value: String) -> Self {
        Attr::Text(value)
    }
}

impl From<f64> for Attr {
    fn from(value: f64) -> Self {
        Attr::Number(value)
    }
}

impl From<bool> for Attr {
    fn from(value: bool) -> Self {
        Attr::Flag(value)
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attr::Text(text) => write!(f, "{}", text.to_lowercase().replace('"', "\\\"")),
            Attr::Number(number) => write!(f, "{number:?}"),
            Attr::Flag(flag) => write!(f, "{flag}"),
            Attr::Unset => write!(f, "none"),
        }
    }
}

/// Dependency digraph collecting DOT statements
#[derive(Debug, Clone)]
pub struct DepGraph {
    options: Vec<String>,
    nodes: Vec<String>,
    edges: Vec<String>,
}

impl Default for DepGraph {
    fn default() -> Self {
        Self {
            options: GRAPH_OPTIONS.iter().map(ToString::to_string).collect(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl DepGraph {
    /// Create a graph with the default layout options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn unpack(attrs: Vec<(&str, Attr)>) -> String {
        attrs
            .into_iter()
            .map(|(key, value)| format!("{key}=\"{value}\""))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Add a node statement
    pub fn node(&mut self, id: &str, attrs: Vec<(&str, Attr)>) {
        self.nodes.push(format!("\"{id}\" [{}]", Self::unpack(attrs)));
    }

    /// Add a directed edge statement from `tail` to `head`
    pub fn edge(&mut self, tail: &str, head: &str, attrs: Vec<(&str, Attr)>) {
        self.edges
            .push(format!("\"{tail}\" -> \"{head}\" [{}]", Self::unpack(attrs)));
    }

    /// Graph in the DOT language; statements are sorted
    #[must_use]
    pub fn render(&self) -> String {
        let mut nodes = self.nodes.clone();
        nodes.sort();
        let mut edges = self.edges.clone();
        edges.sort();

        let mut out = String::from("digraph D {\n\n");
        let empty = String::new();
        let statements = self
            .options
            .iter()
            .chain(std::iter::once(&empty))
            .chain(&nodes)
            .chain(std::iter::once(&empty))
            .chain(&edges);
        for statement in statements {
            out.push_str("  ");
            out.push_str(statement);
            out.push('\n');
        }
        out.push_str("\n}\n");
        out
    }
}

/// Packages grouped by the set of packages pointing at them
#[derive(Debug, Default)]
struct Group {
    sharers: Vec<String>,
    members: Vec<String>,
    bytes: u64,
}

/// Groups in order of first appearance
#[derive(Debug, Default)]
struct Groups {
    groups: Vec<Group>,
    index: HashMap<Vec<String>, usize>,
}

impl Groups {
    fn add(&mut self, sharers: Vec<String>, member: &str, bytes: u64) {
        let i = match self.index.get(&sharers) {
            Some(&i) => i,
            None => {
                self.index.insert(sharers.clone(), self.groups.len());
                self.groups.push(Group {
                    sharers,
                    ..Group::default()
                });
                self.groups.len() - 1
            }
        };
        self.groups[i].members.push(member.to_string());
        self.groups[i].bytes += bytes;
    }
}

fn range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), x| {
        (min.min(x), max.max(x))
    })
}

/// Greedy word wrap that also breaks after hyphens inside words and splits
/// words longer than `width`
#[must_use]
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let letter = |i: usize| chars.get(i).is_some_and(|c| c.is_alphabetic() || *c == '_');

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let whitespace = c == ' ';
        if !current.is_empty() && current.ends_with(' ') != whitespace {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
        let hyphen_break = c == '-'
            && i >= 2
            && letter(i - 1)
            && letter(i - 2)
            && letter(i + 1)
            && (letter(i + 2) || (chars.get(i + 2) == Some(&'-') && letter(i + 3)));
        if hyphen_break {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks.reverse();

    let length = |s: &str| s.chars().count();
    let mut lines = Vec::new();
    while !chunks.is_empty() {
        let mut line: Vec<String> = Vec::new();
        let mut used = 0;

        if !lines.is_empty() && chunks.last().is_some_and(|c| c.trim().is_empty()) {
            chunks.pop();
        }
        while let Some(chunk) = chunks.last() {
            if used + length(chunk) > width {
                break;
            }
            used += length(chunk);
            line.extend(chunks.pop());
        }
        if let Some(chunk) = chunks.pop() {
            if length(&chunk) > width {
                let chunk: Vec<char> = chunk.chars().collect();
                let space_left = if width < 1 { 1 } else { width - used };
                let mut end = space_left;
                if let Some(hyphen) = chunk[..space_left].iter().rposition(|&c| c == '-') {
                    if hyphen > 0 && chunk[..hyphen].iter().any(|&c| c != '-') {
                        end = hyphen + 1;
                    }
                }
                line.push(chunk[..end].iter().collect());
                chunks.push(chunk[end..].iter().collect());
            } else {
                chunks.push(chunk);
            }
        }
        if line.last().is_some_and(|c| c.trim().is_empty()) {
            line.pop();
        }
        if !line.is_empty() {
            lines.push(line.concat());
        }
    }
    lines
}

fn label(name: &str) -> String {
    let truncated: String = name.chars().take(LABEL_LENGTH).collect();
    wrap(&truncated, LABEL_WIDTH).join("\\n")
}

/// Render the collection as a DOT graph
///
/// # Errors
/// Returns [`RenderError::InvalidColor`] if the palette cannot be derived.
#[allow(clippy::cast_precision_loss, clippy::too_many_lines)]
pub fn render_dot(
    collection: &PackageCollection,
    config: &OutputConfig,
) -> Result<String, RenderError> {
    let palette = Palette::derive()?;
    let top = collection.top();
    let mut graph = DepGraph::new();
    let mut allowed: BTreeSet<&str> = BTreeSet::new();

    // Bottom packages by the top packages requiring them
    let mut bottom_groups = Groups::default();
    for (id, details) in collection.bottom() {
        let sharers: Vec<String> = details
            .recursive_what_requires
            .iter()
            .filter(|x| top.contains_key(*x))
            .cloned()
            .collect();
        bottom_groups.add(sharers, id, details.installed_bytes);
    }
    let shared =
        |group: &&Group| !group.sharers.is_empty() && group.sharers.len() >= config.group_cut_off;

    let (min_b, max_b) = range(
        bottom_groups
            .groups
            .iter()
            .filter(shared)
            .map(|g| g.bytes as f64),
    );
    let (min_t, max_t) = range(top.values().map(dabs_core::PackageDetails::all_bytes));

    // Requirements among the top level
    for (id, details) in top {
        for requirement in &details.requires {
            if let Some((requirement, _)) = top.get_key_value(requirement) {
                allowed.insert(id);
                allowed.insert(requirement);
                graph.edge(
                    id,
                    requirement,
                    vec![("penwidth", 4.0.into()), ("color", palette.top.as_str().into())],
                );
            }
        }
    }

    // Advises among the top level, other advised packages by adviser
    let mut advisers: Vec<(String, BTreeSet<String>)> = Vec::new();
    for (id, details) in top {
        for advice in &details.advises {
            if let Some((advice, _)) = top.get_key_value(advice) {
                graph.edge(
                    id,
                    advice,
                    vec![
                        ("style", "dashed".into()),
                        ("penwidth", 4.0.into()),
                        ("color", palette.advises.as_str().into()),
                    ],
                );
                allowed.insert(id);
                allowed.insert(advice);
            } else {
                match advisers.iter().position(|(a, _)| a == advice) {
                    Some(i) => {
                        advisers[i].1.insert(id.clone());
                    }
                    None => advisers.push((advice.clone(), BTreeSet::from([id.clone()]))),
                }
            }
        }
    }
    let mut advice_groups = Groups::default();
    for (advice, ids) in advisers {
        let Some(details) = collection.get(&advice) else {
            debug!("Advised package {advice} is not installed");
            continue;
        };
        advice_groups.add(ids.into_iter().collect(), &advice, details.installed_bytes);
    }

    // Shared requirement groups
    for (i, group) in bottom_groups.groups.iter().filter(shared).enumerate() {
        let group_id = format!("#{i}");
        let mut members = group.members.clone();
        members.sort();
        graph.node(
            &group_id,
            vec![
                ("shape", "point".into()),
                ("height", min_max_normalize(group.bytes as f64, min_b, max_b, 0.2, 2.0).into()),
                ("fixedsize", true.into()),
                ("color", palette.requires.as_str().into()),
                ("tooltip", members.join("\\n").into()),
            ],
        );
        for sharer in &group.sharers {
            graph.edge(
                sharer,
                &group_id,
                vec![
                    ("arrowhead", Attr::Unset),
                    ("color", palette.requires_edge.as_str().into()),
                    ("penwidth", 1.5.into()),
                ],
            );
            if let Some((sharer, _)) = top.get_key_value(sharer) {
                allowed.insert(sharer);
            }
        }
    }

    // Advised package groups
    for (i, group) in advice_groups.groups.iter().enumerate() {
        let group_id = format!("#R{i}");
        let mut members = group.members.clone();
        members.sort();
        let names: BTreeSet<&str> = group
            .members
            .iter()
            .filter_map(|m| collection.get(m))
            .map(|d| d.name.as_str())
            .collect();
        let label = names.into_iter().collect::<Vec<_>>().join("\\l") + "\\l";
        graph.node(
            &group_id,
            vec![
                ("label", label.into()),
                ("tooltip", members.join("\\n").into()),
                ("shape", "box".into()),
                ("fixedsize", false.into()),
                ("style", "rounded,filled".into()),
                ("penwidth", 2.0.into()),
                ("color", palette.advises.as_str().into()),
                ("fillcolor", palette.advises_fill.as_str().into()),
                ("labeljust", "l".into()),
            ],
        );
        for sharer in &group.sharers {
            graph.edge(
                sharer,
                &group_id,
                vec![
                    ("style", "dashed".into()),
                    ("penwidth", 2.0.into()),
                    ("arrowhead", "none".into()),
                    ("color", palette.advises.as_str().into()),
                ],
            );
            if let Some((sharer, _)) = top.get_key_value(sharer) {
                allowed.insert(sharer);
            }
        }
    }

    let max_complements_ratio = top
        .values()
        .filter_map(dabs_core::PackageDetails::byte_ratios)
        .map(|(_, _, complements)| complements)
        .fold(0.0, f64::max);

    // Top-level packages that take part in an edge
    let top_color = hex_to_float(&palette.top)?;
    let advises_color = hex_to_float(&palette.advises)?;
    let top_fill = hex_to_float(&palette.top_fill)?;
    let advises_fill = hex_to_float(&palette.advises_fill)?;
    for (id, details) in top {
        if !allowed.contains(id.as_str()) {
            continue;
        }
        let t = match details.byte_ratios() {
            Some((_, _, complements)) if complements != 0.0 => {
                min_max_normalize(complements, 0.0, max_complements_ratio, 0.0, 1.0)
            }
            _ => 0.0,
        };
        let mixed = float_to_hex(&mix(top_color, advises_color, t, MixMode::Oklab, AlphaMode::Mix));
        let mixed_fill =
            float_to_hex(&mix(top_fill, advises_fill, t, MixMode::Oklab, AlphaMode::Mix));
        let mixed = copy_hue(&mixed, &mixed_fill)?;
        graph.node(
            id,
            vec![
                ("label", label(&details.name).into()),
                ("shape", "circle".into()),
                ("penwidth", "4".into()),
                (
                    "height",
                    min_max_normalize(details.all_bytes(), min_t, max_t, 1.2, 3.0).into(),
                ),
                ("fixedsize", true.into()),
                ("color", mixed.into()),
                ("fillcolor", mixed_fill.into()),
                ("style", "filled".into()),
            ],
        );
    }

    debug!(
        "DOT graph with {} top-level nodes, {} requirement groups and {} advice groups",
        allowed.len(),
        bottom_groups.groups.iter().filter(shared).count(),
        advice_groups.groups.len()
    );
    Ok(graph.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_after_hyphens() {
        assert_eq!(
            wrap("gnome-shell-extension-appindicator", 10),
            vec!["gnome-", "shell-", "extension-", "appindicat", "or"]
        );
        assert_eq!(wrap("vim", 10), vec!["vim"]);
        assert_eq!(
            wrap("GNU Image Manipulation Program", 10),
            vec!["GNU Image ", "Manipulati", "on Program"]
        );
        assert_eq!(wrap("libreoffice-l10n-de", 10), vec!["libreoffic", "e-l10n-de"]);
        assert_eq!(wrap("ab-cd-efghijklmnop", 10), vec!["ab-cd-efgh", "ijklmnop"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn test_label_is_truncated_and_escaped() {
        let name = "a".repeat(50);
        let label = label(&name);
        assert_eq!(label, vec!["a".repeat(10); 4].join("\\n"));
    }

    #[test]
    fn test_attribute_formatting() {
        assert_eq!(Attr::from("Rounded,Filled").to_string(), "rounded,filled");
        assert_eq!(Attr::from(1.5).to_string(), "1.5");
        assert_eq!(Attr::from(3.0).to_string(), "3.0");
        assert_eq!(Attr::from(true).to_string(), "true");
        assert_eq!(Attr::Unset.to_string(), "none");
    }

    #[test]
    fn test_empty_graph_layout() {
        let rendered = DepGraph::new().render();
        assert!(rendered.starts_with("digraph D {\n\n  overlap=prism\n"));
        assert!(rendered.contains("  node [fontname=Cantarell]\n  \n  \n"));
        assert!(rendered.ends_with("\n}\n"));
    }

    #[test]
    fn test_statements_are_sorted() {
        let mut graph = DepGraph::new();
        graph.edge("b", "a", vec![("penwidth", 4.0.into())]);
        graph.edge("a", "b", vec![("penwidth", 4.0.into())]);
        let rendered = graph.render();
        let first = rendered.find("\"a\" -> \"b\"").unwrap();
        let second = rendered.find("\"b\" -> \"a\"").unwrap();
        assert!(first < second);
        assert!(rendered.contains("\"a\" -> \"b\" [penwidth=\"4.0\"]"));
    }
}
