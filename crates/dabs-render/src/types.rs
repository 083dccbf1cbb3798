//! Renderer settings

use serde::{Deserialize, Serialize};

/// Output settings, read from the `[output]` table of the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Width of the bar chart bars
    pub bar_width: usize,
    /// Width of the size bars in the details listing
    pub details_bar_width: usize,
    /// Minimum number of sharing top-level packages for a DOT group node
    pub group_cut_off: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bar_width: 15,
            details_bar_width: 10,
            group_cut_off: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config: OutputConfig = toml::from_str("bar_width = 30").unwrap();
        assert_eq!(config.bar_width, 30);
        assert_eq!(config.details_bar_width, 10);
        assert_eq!(config.group_cut_off, 2);
    }
}
