//! Error types for dabs-render

use thiserror::Error;

/// Errors that can occur while rendering
#[derive(Error, Debug)]
pub enum RenderError {
    /// No single package identifier starts with the query
    #[error("no unique package matches \"{query}\"")]
    NoCandidate {
        /// What the user asked for
        query: String,
        /// Most similar identifier, if the collection is not empty
        closest: Option<String>,
        /// Identifiers starting with the query, sorted
        candidates: Vec<String>,
    },

    /// An arrow from a node to itself was requested
    #[error("self-referencing arrow at \"{0}\"")]
    SelfReference(String),

    /// Arrow endpoint is not a node of the graph
    #[error("unknown node \"{0}\"")]
    UnknownNode(String),

    /// Malformed colour notation
    #[error("invalid colour: {0}")]
    InvalidColor(String),

    /// Reader of a pipe went away
    #[error("broken pipe")]
    BrokenPipe,

    /// I/O error writing output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Suggestion lines printed when a package lookup fails
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        let Self::NoCandidate {
            query,
            closest,
            candidates,
        } = self
        else {
            return Vec::new();
        };

        let mut lines = vec![format!(
            "Did you mean \"{}\"?",
            closest.as_deref().unwrap_or_default()
        )];
        if candidates.len() > 1 {
            lines.push(String::new());
            lines.push(format!("Packages that start with \"{query}\":"));
            lines.extend(candidates.iter().map(|c| format!("  • {c}")));
        }
        lines
    }
}
