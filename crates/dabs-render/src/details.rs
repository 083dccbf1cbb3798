//! Details listing of one package and its dependency closure

use std::collections::{BTreeSet, HashMap};

use dabs_core::formulas::min_max_normalize;
use dabs_core::graph::bfs;
use dabs_core::{Level, PackageCollection, PackageDetails};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::arrow_graph::{ArrowGraph, ArrowOptions};
use crate::error::RenderError;
use crate::styles::{self, BAR_CHAR, BAR_GAP_CHAR};
use crate::types::OutputConfig;

fn pad(text: &str, width: usize) -> String {
    format!("{text}{}", " ".repeat(width.saturating_sub(text.width())))
}

/// List `id` and everything it recursively requires or advises
///
/// Packages are grouped by distance from `id`. Arrows of even distances are
/// drawn left of the names, odd distances right of the size bars.
///
/// # Errors
/// Returns [`RenderError::UnknownNode`] if `id` is not in the collection.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn details(
    collection: &PackageCollection,
    id: &str,
    config: &OutputConfig,
) -> Result<Vec<Line<'static>>, RenderError> {
    let root = collection
        .get(id)
        .ok_or_else(|| RenderError::UnknownNode(id.to_string()))?;
    let neighbours = |x: &str| -> Vec<String> {
        collection.get(x).map_or_else(Vec::new, |d| {
            d.requires
                .iter()
                .chain(&d.advises)
                .filter(|dep| collection.contains(dep))
                .cloned()
                .collect()
        })
    };
    let reached = bfs(id, neighbours);

    let mut nodes: Vec<String> = Vec::new();
    let mut previous = 0;
    for (node, level) in &reached {
        if *level != previous {
            nodes.push(String::new());
            previous = *level;
        }
        nodes.push(node.clone());
    }

    let options = ArrowOptions {
        allow_crossing: true,
        compact: true,
        ..ArrowOptions::default()
    };
    let mut graphs = [ArrowGraph::new(&nodes), ArrowGraph::new(&nodes)];
    for (node, level) in &reached {
        let Some(package) = collection.get(node) else {
            continue;
        };
        let graph = &mut graphs[level % 2];
        let heads = |list: &[String]| -> Vec<String> {
            list.iter()
                .filter(|x| *x != node && collection.contains(x))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        let requires = heads(&package.requires);
        if !requires.is_empty() {
            graph.arrow(node, &requires, styles::low(styles::requires()), options)?;
        }
        let advises = heads(&package.advises);
        if !advises.is_empty() {
            graph.arrow(node, &advises, styles::complements(), options)?;
        }
    }
    let [left, right] = graphs;
    let left = left.render(false);
    let right = right.render(true);

    let packages: Vec<&PackageDetails> = nodes.iter().filter_map(|n| collection.get(n)).collect();
    let name_width = packages.iter().map(|d| d.name.width()).max().unwrap_or(0);
    let largest = packages.iter().map(|d| d.installed_bytes).max().unwrap_or(0) as f64;
    let bar_width = config.details_bar_width;

    let mut lines = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let mut spans: Vec<Span<'static>> = left[i].spans.clone();
        spans.push(Span::raw(" "));

        match collection.get(node) {
            None => {
                spans.push(Span::raw(format!(
                    "{} {} ",
                    " ".repeat(name_width),
                    " ".repeat(bar_width)
                )));
            }
            Some(package) => {
                let style = if i == 0 {
                    Style::default()
                } else if root.recursive_requires.contains(node) {
                    styles::requires()
                } else {
                    styles::complements()
                };
                let size = min_max_normalize(
                    package.installed_bytes as f64,
                    0.0,
                    largest,
                    0.0,
                    bar_width as f64,
                )
                .round_ties_even() as usize;
                spans.push(Span::styled(pad(&package.name, name_width), style));
                spans.push(Span::raw(" "));
                spans.push(Span::styled(
                    BAR_GAP_CHAR.repeat(bar_width.saturating_sub(size)),
                    styles::off(),
                ));
                spans.push(Span::styled(BAR_CHAR.repeat(size), styles::installed()));
                spans.push(Span::raw(" "));
            }
        }

        spans.extend(right[i].spans.iter().cloned());
        lines.push(Line::from(spans));
    }

    debug!(
        top = collection.level_of(id) == Some(Level::Top),
        "details of {id}: {root:#?}"
    );
    Ok(lines)
}

/// Ratio of matching characters between two strings, between 0 and 1
///
/// Matching characters are found by recursively taking the longest common
/// substring and continuing on both sides of it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut matches = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(&a, &positions, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matches += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

/// Longest block `a[i..i + k] == b[j..j + k]` inside the given bounds,
/// earliest in `a`, then earliest in `b`
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let mut lengths: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next = HashMap::new();
        for &j in positions.get(c).map_or(&[][..], Vec::as_slice) {
            if j < blo {
                continue;
            }
            if j >= bhi {
                break;
            }
            let k = j
                .checked_sub(1)
                .and_then(|previous| lengths.get(&previous))
                .copied()
                .unwrap_or(0)
                + 1;
            next.insert(j, k);
            if k > best_k {
                (best_i, best_j, best_k) = (i + 1 - k, j + 1 - k, k);
            }
        }
        lengths = next;
    }

    (best_i, best_j, best_k)
}

/// Resolve `query` to the only identifier starting with it
///
/// # Errors
/// Returns [`RenderError::NoCandidate`] with the most similar identifier and
/// all prefix matches when there is no unique prefix match.
pub fn find_candidate(collection: &PackageCollection, query: &str) -> Result<String, RenderError> {
    let candidates: BTreeSet<&String> = collection
        .ids()
        .filter(|id| id.starts_with(query))
        .collect();
    if candidates.len() == 1 {
        if let Some(candidate) = candidates.first() {
            return Ok((*candidate).clone());
        }
    }

    let closest = collection
        .ids()
        .map(|id| (similarity(query, id), id))
        .max_by(|(a, x), (b, y)| a.total_cmp(b).then_with(|| x.cmp(y)))
        .map(|(_, id)| id.clone());

    Err(RenderError::NoCandidate {
        query: query.to_string(),
        closest,
        candidates: candidates.into_iter().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn sample() -> PackageCollection {
        let mut collection = PackageCollection::new();
        collection.add(
            Level::Top,
            "app",
            PackageDetails::new("app")
                .with_installed_bytes(100)
                .with_requires(["lib", "app"])
                .with_advises(["extra"]),
        );
        collection.add(
            Level::Bottom,
            "lib",
            PackageDetails::new("lib")
                .with_installed_bytes(50)
                .with_requires(["base"]),
        );
        collection.add(
            Level::Bottom,
            "extra",
            PackageDetails::new("extra").with_installed_bytes(10),
        );
        collection.add(Level::Bottom, "base", PackageDetails::new("base"));
        collection.compute_recursive_dependencies();
        collection
    }

    #[test]
    fn test_details_layout() {
        let lines = details(&sample(), "app", &OutputConfig::default()).unwrap();
        let text: Vec<String> = lines.iter().map(plain).collect();

        // app, spacer, lib, extra, spacer, base
        assert_eq!(text.len(), 6);
        assert!(text[0].contains("app   ━━━━━━━━━━"), "{}", text[0]);
        assert!(text[2].contains("lib   ╴╴╴╴╴━━━━━"), "{}", text[2]);
        assert!(text[3].contains("extra ╴╴╴╴╴╴╴╴╴━"), "{}", text[3]);
        assert!(text[5].contains("base  ╴╴╴╴╴╴╴╴╴╴"), "{}", text[5]);
        assert!(text.iter().all(|line| line.width() == text[0].width()));
    }

    #[test]
    fn test_details_arrows() {
        let lines = details(&sample(), "app", &OutputConfig::default()).unwrap();
        let text: Vec<String> = lines.iter().map(plain).collect();

        // Root arrows on the left, pointing right
        assert!(text[0].trim_start().starts_with('╭'));
        assert!(text[2].contains("►"));
        // Second level arrows on the right
        assert!(text[2].trim_end().ends_with('╮'));
        assert!(text[5].contains("◄"));
    }

    #[test]
    fn test_details_name_colours() {
        let lines = details(&sample(), "app", &OutputConfig::default()).unwrap();
        let styled = |line: &Line<'_>, name: &str| {
            line.spans
                .iter()
                .find(|s| s.content.trim() == name)
                .map(|s| s.style)
        };
        assert_eq!(styled(&lines[2], "lib"), Some(styles::requires()));
        assert_eq!(styled(&lines[3], "extra"), Some(styles::complements()));
    }

    #[test]
    fn test_details_unknown_package() {
        let result = details(&sample(), "nothing", &OutputConfig::default());
        assert!(matches!(result, Err(RenderError::UnknownNode(_))));
    }

    #[test]
    fn test_similarity() {
        assert!((similarity("abcd", "bcde") - 0.75).abs() < 1e-12);
        assert!((similarity("", "") - 1.0).abs() < 1e-12);
        assert!(similarity("abc", "xyz").abs() < 1e-12);
        assert!((similarity("firefox", "firefox") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_find_candidate_unique_prefix() {
        assert_eq!(find_candidate(&sample(), "ex").unwrap(), "extra");
        assert_eq!(find_candidate(&sample(), "app").unwrap(), "app");
    }

    #[test]
    fn test_find_candidate_suggestions() {
        let mut collection = sample();
        collection.add(Level::Bottom, "libx", PackageDetails::new("libx"));

        let error = find_candidate(&collection, "li").unwrap_err();
        assert_eq!(
            error.suggestions(),
            vec![
                "Did you mean \"lib\"?".to_string(),
                String::new(),
                "Packages that start with \"li\":".to_string(),
                "  • lib".to_string(),
                "  • libx".to_string(),
            ]
        );

        let error = find_candidate(&collection, "bsae").unwrap_err();
        assert_eq!(error.suggestions(), vec!["Did you mean \"base\"?".to_string()]);
    }
}
