//! Bar chart of top-level packages by attributed size

use dabs_core::convert::bytes_to_human_si;
use dabs_core::formulas::normalize_all;
use dabs_core::{PackageCollection, PackageDetails};
use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::styles::{self, BAR_CHAR};
use crate::types::OutputConfig;

/// Complements ratio above which the largest advised package is named
const NOTABLE_COMPLEMENTS_RATIO: f64 = 0.33;

/// Wording of the legend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legend {
    /// Distribution packages
    Native,
    /// Flatpak applications and runtimes
    Flatpak,
}

impl Legend {
    /// Explanation of each bar segment colour
    #[must_use]
    pub fn texts(self) -> [&'static str; 3] {
        match self {
            Legend::Flatpak => [
                "application size",
                "runtime size per share count",
                "sum of size per share count over all recursive extensions",
            ],
            Legend::Native => [
                "size of the explicitly user-installed package",
                "sum of size per share count over all implicit recursive requirements",
                "sum of size per share count over all other implicit recursive \
                 requirements and recommendations",
            ],
        }
    }

    /// One line per bar segment colour
    #[must_use]
    pub fn lines(self) -> Vec<Line<'static>> {
        let segment_styles = [styles::installed(), styles::requires(), styles::complements()];
        self.texts()
            .into_iter()
            .zip(segment_styles)
            .map(|(text, style)| {
                Line::from(vec![
                    Span::styled(BAR_CHAR, style),
                    Span::raw(format!(" {text}")),
                ])
            })
            .collect()
    }
}

/// One chart row
#[derive(Debug, Clone)]
pub struct BarRow {
    /// Package identifier
    pub id: String,
    /// Rendered row
    pub line: Line<'static>,
}

/// Rendered bar chart
#[derive(Debug, Clone)]
pub struct BarChart {
    /// Legend lines
    pub legend: Vec<Line<'static>>,
    /// Rows ordered by size, largest first
    pub rows: Vec<BarRow>,
}

impl BarChart {
    /// Legend, a blank line, then the rows
    #[must_use]
    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = self.legend.clone();
        lines.push(Line::default());
        lines.extend(self.rows.iter().map(|row| row.line.clone()));
        lines
    }
}

/// Chart the top level by `all_bytes`, largest first
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bar_chart(
    collection: &PackageCollection,
    legend: Legend,
    config: &OutputConfig,
) -> BarChart {
    let width = config.bar_width as f64;
    let mut ordered: Vec<(&String, &PackageDetails)> = collection.top().iter().collect();
    ordered.sort_by(|a, b| b.1.all_bytes().total_cmp(&a.1.all_bytes()));

    let sizes: Vec<f64> = ordered.iter().map(|(_, details)| details.all_bytes()).collect();
    let minimum = sizes.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = sizes.iter().copied().fold(0.0, f64::max);
    let shortest = if maximum > 0.0 {
        (minimum * width / maximum).round_ties_even()
    } else {
        0.0
    };

    let rows = ordered
        .into_iter()
        .zip(normalize_all(&sizes, shortest, width))
        .map(|((id, details), size)| BarRow {
            id: id.clone(),
            line: row(collection, details, size, config.bar_width),
        })
        .collect();

    BarChart {
        legend: legend.lines(),
        rows,
    }
}

#[allow(clippy::float_cmp)]
fn ratio_style(ratio: f64, largest: f64, base: Style) -> Style {
    if ratio == 0.0 {
        styles::off()
    } else if ratio == largest {
        styles::high(base)
    } else {
        base
    }
}

/// Largest advised bottom package by size per share count
#[allow(clippy::cast_precision_loss)]
fn notable_advice<'a>(
    collection: &'a PackageCollection,
    details: &PackageDetails,
) -> Option<&'a PackageDetails> {
    let mut best: Option<(&PackageDetails, f64)> = None;
    for advice in &details.advises {
        let Some(candidate) = collection.bottom().get(advice) else {
            continue;
        };
        let share = candidate.installed_bytes as f64 / candidate.count.unwrap_or(1).max(1) as f64;
        if best.is_none_or(|(_, size)| share > size) {
            best = Some((candidate, share));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn row(
    collection: &PackageCollection,
    details: &PackageDetails,
    size: f64,
    width: usize,
) -> Line<'static> {
    let human = bytes_to_human_si(details.all_bytes() as u64);
    let (value, unit) = human.split_once(' ').unwrap_or((human.as_str(), ""));

    let mut spans = vec![
        Span::styled(format!("{value:>4} "), styles::dim()),
        Span::raw(format!("{unit:<2} ")),
    ];

    let (segments, complements_ratio) = match details.byte_ratios() {
        None => {
            spans.push(Span::styled("NaN NaN NaN", styles::off()));
            ([0; 3], 0.0)
        }
        Some((installed, requires, complements)) => {
            let ratios = [installed, requires, complements];
            let largest = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut segments = ratios.map(|ratio| (size * ratio).round_ties_even());

            // Rounding slack goes to the largest segment so the bar fills `size`
            let index = ratios.iter().position(|&r| r == largest).unwrap_or(0);
            segments[index] += size.round_ties_even() - segments.iter().sum::<f64>();

            let bases = [styles::installed(), styles::requires(), styles::complements()];
            for (i, (ratio, base)) in ratios.into_iter().zip(bases).enumerate() {
                let separator = if i < 2 { " " } else { "" };
                spans.push(Span::styled(
                    format!("{ratio:.1}{separator}"),
                    ratio_style(ratio, largest, base),
                ));
            }
            (segments.map(|s| s.max(0.0) as usize), complements)
        }
    };

    spans.push(Span::raw(" ["));
    let bases = [styles::installed(), styles::requires(), styles::complements()];
    for (length, style) in segments.into_iter().zip(bases) {
        if length > 0 {
            spans.push(Span::styled(BAR_CHAR.repeat(length), style));
        }
    }
    let filled: usize = segments.iter().sum();
    spans.push(Span::raw(format!(
        "{}] {}",
        " ".repeat(width.saturating_sub(filled)),
        details.name
    )));

    if complements_ratio > NOTABLE_COMPLEMENTS_RATIO {
        if let Some(advice) = notable_advice(collection, details) {
            let mut text = format!("-> {}", advice.name);
            let complementing = details
                .recursive_complements
                .iter()
                .filter(|id| collection.bottom().contains_key(*id))
                .count();
            if complementing > 1 {
                text.push_str("...");
            }
            spans.push(Span::raw(" "));
            spans.push(Span::styled(text, styles::complements()));
        }
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dabs_core::Level;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn sample() -> PackageCollection {
        let mut collection = PackageCollection::new();
        collection.add(
            Level::Top,
            "editor",
            PackageDetails::new("editor")
                .with_installed_bytes(1_000_000)
                .with_requires(["libtext"]),
        );
        collection.add(
            Level::Top,
            "player",
            PackageDetails::new("player")
                .with_installed_bytes(100_000)
                .with_advises(["codecs", "skins"]),
        );
        collection.add(Level::Top, "empty", PackageDetails::new("empty"));
        collection.add(
            Level::Bottom,
            "libtext",
            PackageDetails::new("libtext").with_installed_bytes(1_000_000),
        );
        collection.add(
            Level::Bottom,
            "codecs",
            PackageDetails::new("codecs").with_installed_bytes(600_000),
        );
        collection.add(
            Level::Bottom,
            "skins",
            PackageDetails::new("skins").with_installed_bytes(300_000),
        );
        collection.compute_recursive_dependencies();
        collection.compute_pseudobytes();
        collection
    }

    #[test]
    fn test_rows_are_ordered_by_size() {
        let chart = bar_chart(&sample(), Legend::Native, &OutputConfig::default());
        let ids: Vec<&str> = chart.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["editor", "player", "empty"]);
    }

    #[test]
    fn test_row_layout() {
        let chart = bar_chart(&sample(), Legend::Native, &OutputConfig::default());
        let editor = plain(&chart.rows[0].line);
        assert_eq!(editor, format!("   2 MB 0.5 0.5 0.0 [{}] editor", "━".repeat(15)));
    }

    #[test]
    fn test_notable_advice() {
        let chart = bar_chart(&sample(), Legend::Native, &OutputConfig::default());
        let player = plain(&chart.rows[1].line);
        assert!(player.ends_with("] player -> codecs..."), "{player}");
    }

    #[test]
    fn test_zero_sized_package() {
        let chart = bar_chart(&sample(), Legend::Native, &OutputConfig::default());
        let empty = plain(&chart.rows[2].line);
        assert_eq!(empty, format!("   0 B  NaN NaN NaN [{}] empty", " ".repeat(15)));
    }

    #[test]
    fn test_legend_and_lines() {
        let chart = bar_chart(&sample(), Legend::Flatpak, &OutputConfig::default());
        assert_eq!(chart.legend.len(), 3);
        assert_eq!(plain(&chart.legend[0]), "━ application size");

        let lines = chart.lines();
        assert_eq!(lines.len(), 3 + 1 + 3);
        assert!(plain(&lines[3]).is_empty());
    }

    #[test]
    fn test_empty_collection() {
        let chart = bar_chart(&PackageCollection::new(), Legend::Native, &OutputConfig::default());
        assert!(chart.rows.is_empty());
    }
}
