//! Text digraph over vertically stacked nodes
//!
//! Each node occupies one row. Arrows run from a tail row through a vertical
//! line to one or more head rows, packed into as few columns as possible.
//! Rendering right-to-left mirrors the drawing so the same graph can sit on
//! either side of a listing.

use std::collections::HashMap;

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::error::RenderError;

const BLANK: char = ' ';
const VERTICAL: char = '│';
const HORIZONTAL: char = '─';
const TAIL: char = '╾';
const TOP_CORNER: char = '╮';
const BOTTOM_CORNER: char = '╯';
const JUNCTION: char = '┤';
const HEAD: char = '◄';
const HEAD_REVERSED: char = '►';

fn mirrored(character: char) -> char {
    match character {
        '►' => '◄',
        '◄' => '►',
        '╯' => '╰',
        '╮' => '╭',
        '┤' => '├',
        '╾' => '╼',
        other => other,
    }
}

/// Options of a single arrow
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowOptions {
    /// Point heads the other way
    pub reverse: bool,
    /// May cross existing vertical lines
    pub allow_crossing: bool,
    /// Only head rows need to be free in the vertical line's column
    pub compact: bool,
}

/// Textual digraph for vertical nodes
#[derive(Debug, Clone)]
pub struct ArrowGraph {
    rows: usize,
    indices: HashMap<String, usize>,
    /// Columns left to right; grows whenever a column past the end is inspected
    columns: Vec<Vec<char>>,
    styles: Vec<Vec<Style>>,
}

impl ArrowGraph {
    /// Create a graph whose rows are `nodes`; empty strings are spacer rows
    pub fn new<S: AsRef<str>>(nodes: &[S]) -> Self {
        let indices = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.as_ref().to_string(), i))
            .collect();
        Self {
            rows: nodes.len(),
            indices,
            columns: Vec::new(),
            styles: Vec::new(),
        }
    }

    /// Number of columns drawn so far
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    fn column(&mut self, index: usize) -> &[char] {
        while self.columns.len() <= index {
            self.columns.push(vec![BLANK; self.rows]);
            self.styles.push(vec![Style::default(); self.rows]);
        }
        &self.columns[index]
    }

    fn cell(&mut self, column: usize, row: usize) -> char {
        self.column(column)[row]
    }

    fn set(&mut self, column: usize, row: usize, character: char, style: Style) {
        self.column(column);
        self.columns[column][row] = character;
        self.styles[column][row] = style;
    }

    fn index(&self, node: &str) -> Result<usize, RenderError> {
        self.indices
            .get(node)
            .copied()
            .ok_or_else(|| RenderError::UnknownNode(node.to_string()))
    }

    /// Draw an arrow from `tail` to every node of `heads`
    ///
    /// # Errors
    /// Returns [`RenderError::SelfReference`] when `tail` is among `heads` and
    /// [`RenderError::UnknownNode`] for nodes that are not rows of the graph.
    pub fn arrow<S: AsRef<str>>(
        &mut self,
        tail: &str,
        heads: &[S],
        style: Style,
        options: ArrowOptions,
    ) -> Result<(), RenderError> {
        if heads.iter().any(|head| head.as_ref() == tail) {
            return Err(RenderError::SelfReference(tail.to_string()));
        }
        let tail_index = self.index(tail)?;
        let head_indices = heads
            .iter()
            .map(|head| self.index(head.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let minimum = head_indices.iter().copied().fold(tail_index, usize::min);
        let maximum = head_indices.iter().copied().fold(tail_index, usize::max);
        let head_character = if options.reverse { HEAD_REVERSED } else { HEAD };
        let allowed: &[char] = if options.allow_crossing {
            &[BLANK, VERTICAL]
        } else {
            &[BLANK]
        };

        // Start right of the last occupied cell on the tail row
        let mut column = (0..self.columns.len())
            .rev()
            .find(|&i| !allowed.contains(&self.columns[i][tail_index]))
            .map_or(0, |i| i + 1);
        self.set(column, tail_index, TAIL, style);

        // Move right until two free columns span the arrow
        loop {
            let free = [column + 1, column + 2].into_iter().all(|c| {
                self.column(c)[minimum..=maximum]
                    .iter()
                    .all(|&character| character == BLANK)
            });
            if free {
                break;
            }
            column += 1;
            if self.cell(column, tail_index) != VERTICAL {
                self.set(column, tail_index, HORIZONTAL, style);
            }
        }

        // Extra horizontal segment when the current column is in the way
        let points: Vec<char> = if options.compact {
            head_indices
                .iter()
                .map(|&i| self.columns[column][i])
                .collect()
        } else {
            self.columns[column][minimum..=maximum].to_vec()
        };
        let passable = |c: &char| allowed.contains(c) || *c == HORIZONTAL || *c == TAIL;
        if !points.iter().all(passable) {
            column += 1;
            self.set(column, tail_index, HORIZONTAL, style);
        }

        // Vertical line
        column += 1;
        for row in minimum..=maximum {
            let character = if row == minimum {
                TOP_CORNER
            } else if row == maximum {
                BOTTOM_CORNER
            } else if row == tail_index || head_indices.contains(&row) {
                JUNCTION
            } else {
                VERTICAL
            };
            self.set(column, row, character, style);
        }

        // Heads
        for &head in &head_indices {
            for i in (0..column).rev() {
                if i == 0 || !allowed.contains(&self.columns[i - 1][head]) {
                    self.set(i, head, head_character, style);
                    break;
                }
                if self.columns[i][head] != VERTICAL {
                    self.set(i, head, HORIZONTAL, style);
                }
            }
        }

        Ok(())
    }

    /// Render one line per node
    ///
    /// Left-to-right keeps the drawing as is; otherwise columns are reversed
    /// and directional characters mirrored.
    #[must_use]
    pub fn render(&self, left_to_right: bool) -> Vec<Line<'static>> {
        let order: Vec<usize> = if left_to_right {
            (0..self.columns.len()).collect()
        } else {
            (0..self.columns.len()).rev().collect()
        };

        (0..self.rows)
            .map(|row| {
                let mut spans: Vec<Span<'static>> = Vec::new();
                let mut text = String::new();
                let mut current: Option<Style> = None;

                for &column in &order {
                    let mut character = self.columns[column][row];
                    if !left_to_right {
                        character = mirrored(character);
                    }
                    let style = self.styles[column][row];
                    if current != Some(style) {
                        if let Some(previous) = current {
                            spans.push(Span::styled(std::mem::take(&mut text), previous));
                        }
                        current = Some(style);
                    }
                    text.push(character);
                }
                if let Some(style) = current {
                    spans.push(Span::styled(text, style));
                }
                Line::from(spans)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_single_arrow() {
        let mut graph = ArrowGraph::new(&["a", "b"]);
        graph
            .arrow("a", &["b"], Style::default(), ArrowOptions::default())
            .unwrap();

        assert_eq!(plain(&graph.render(true)), vec!["╾╮ ", "◄╯ "]);
        assert_eq!(plain(&graph.render(false)), vec![" ╭╼", " ╰►"]);
    }

    #[test]
    fn test_fan_out_with_spacer() {
        let mut graph = ArrowGraph::new(&["a", "", "b", "c"]);
        graph
            .arrow("a", &["b", "c"], Style::default(), ArrowOptions::default())
            .unwrap();

        assert_eq!(
            plain(&graph.render(true)),
            vec!["╾╮ ", " │ ", "◄┤ ", "◄╯ "]
        );
    }

    #[test]
    fn test_second_arrow_moves_right() {
        let options = ArrowOptions {
            allow_crossing: true,
            compact: true,
            ..ArrowOptions::default()
        };
        let mut graph = ArrowGraph::new(&["a", "b", "c"]);
        graph.arrow("a", &["c"], Style::default(), options).unwrap();
        graph.arrow("b", &["c"], Style::default(), options).unwrap();

        assert_eq!(graph.width(), 4);
        assert_eq!(plain(&graph.render(true)), vec!["╾╮  ", "╾│─╮", "◄╯◄╯"]);
    }

    #[test]
    fn test_rejects_self_reference() {
        let mut graph = ArrowGraph::new(&["a", "b"]);
        let result = graph.arrow("a", &["a", "b"], Style::default(), ArrowOptions::default());
        assert!(matches!(result, Err(RenderError::SelfReference(_))));
    }

    #[test]
    fn test_rejects_unknown_node() {
        let mut graph = ArrowGraph::new(&["a"]);
        let result = graph.arrow("a", &["zzz"], Style::default(), ArrowOptions::default());
        assert!(matches!(result, Err(RenderError::UnknownNode(_))));
    }
}
