//! Two-level package collection
//!
//! Packages presumed explicitly installed by the user live on the top level;
//! everything that is only there to satisfy them lives on the bottom level.
//! Both levels are ordered maps so every traversal, and therefore every
//! rendered output, is reproducible.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::graph::dfs;

/// Level of a package in the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Explicitly user-installed
    Top,
    /// Present only as a (recursive) dependency
    Bottom,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Top => write!(f, "top"),
            Level::Bottom => write!(f, "bottom"),
        }
    }
}

/// Flatpak ref classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variety {
    /// Application
    App,
    /// Runtime
    Runtime,
    /// Runtime used as an extension of another ref
    RuntimeExtension,
    /// Locale or Debug extension
    HiddenExtension,
}

impl Variety {
    /// Directory name of the ref kind under a Flatpak installation
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Variety::App => "app",
            Variety::Runtime | Variety::RuntimeExtension | Variety::HiddenExtension => "runtime",
        }
    }
}

/// Kind of a dependency relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Mandatory dependency
    Requires,
    /// Recommendation / weak dependency, installed by default
    Advises,
    /// Suggestion, not installed by default
    Suggests,
    /// Reverse weak dependency
    Supplements,
    /// Reverse suggestion
    Enhances,
}

/// A directed dependency between two packages of the collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Depending package
    pub from: String,
    /// Dependency
    pub to: String,
    /// Relationship
    pub kind: EdgeKind,
}

/// Details of one installed package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageDetails {
    /// Display name
    pub name: String,
    /// Installed version
    pub version: Option<String>,
    /// One-line description
    pub description: Option<String>,
    /// Section / group
    pub category: Option<String>,
    /// Flatpak classification
    pub variety: Option<Variety>,
    /// Flatpak installation ("user" or "system")
    pub installation: Option<String>,
    /// Whether the backend marks the package as automatically installed
    pub auto_installed: bool,

    // Debian treats recommends as a strong dependency while Fedora treats
    // them as weak, so both end up in `advises`: installed by default but
    // not mandatory.
    /// Mandatory dependencies
    pub requires: Vec<String>,
    /// Recommended dependencies
    pub advises: Vec<String>,
    /// Suggested packages
    pub suggests: Option<Vec<String>>,
    /// Packages this one supplements
    pub supplements: Option<Vec<String>>,
    /// Packages this one enhances
    pub enhances: Option<Vec<String>>,

    /// Everything reachable through `requires`
    pub recursive_requires: BTreeSet<String>,
    /// Everything reachable through `requires` and `advises` but not `requires` alone
    pub recursive_complements: BTreeSet<String>,
    /// Packages that recursively require this one
    pub recursive_what_requires: BTreeSet<String>,
    /// Packages this one recursively complements
    pub recursive_what_complements: BTreeSet<String>,

    /// Installed size in bytes
    pub installed_bytes: u64,
    /// Number of top-level packages sharing this package
    pub count: Option<usize>,
    /// Bytes attributed through recursive requirements
    pub r_requires_pseudobytes: f64,
    /// Bytes attributed through recursive complements
    pub r_complements_pseudobytes: f64,
}

impl PackageDetails {
    /// Create details with a display name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set installed size
    #[must_use]
    pub fn with_installed_bytes(mut self, bytes: u64) -> Self {
        self.installed_bytes = bytes;
        self
    }

    /// Set mandatory dependencies
    #[must_use]
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    /// Set recommended dependencies
    #[must_use]
    pub fn with_advises<I, S>(mut self, advises: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.advises = advises.into_iter().map(Into::into).collect();
        self
    }

    /// Mark as automatically installed
    #[must_use]
    pub fn with_auto_installed(mut self, auto_installed: bool) -> Self {
        self.auto_installed = auto_installed;
        self
    }

    /// All attributed bytes
    #[must_use]
    pub fn pseudobytes(&self) -> f64 {
        self.r_requires_pseudobytes + self.r_complements_pseudobytes
    }

    /// Own size plus attributed bytes
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn all_bytes(&self) -> f64 {
        self.pseudobytes() + self.installed_bytes as f64
    }

    /// Fractions of `all_bytes` as (installed, requires, complements)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn byte_ratios(&self) -> Option<(f64, f64, f64)> {
        let all = self.all_bytes();
        if all == 0.0 {
            return None;
        }
        let installed = self.installed_bytes as f64 / all;
        let requires = self.r_requires_pseudobytes / all;
        Some((installed, requires, 1.0 - (installed + requires)))
    }

    fn dependency_lists(&self) -> [(EdgeKind, &[String]); 5] {
        [
            (EdgeKind::Requires, self.requires.as_slice()),
            (EdgeKind::Advises, self.advises.as_slice()),
            (EdgeKind::Suggests, self.suggests.as_deref().unwrap_or_default()),
            (
                EdgeKind::Supplements,
                self.supplements.as_deref().unwrap_or_default(),
            ),
            (EdgeKind::Enhances, self.enhances.as_deref().unwrap_or_default()),
        ]
    }
}

/// Two-level package collection keyed by package identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageCollection {
    top: BTreeMap<String, PackageDetails>,
    bottom: BTreeMap<String, PackageDetails>,
}

impl PackageCollection {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package, replacing any package with the same identifier
    pub fn add(&mut self, level: Level, id: impl Into<String>, details: PackageDetails) {
        let id = id.into();
        self.top.remove(&id);
        self.bottom.remove(&id);
        self.level_map_mut(level).insert(id, details);
    }

    /// Top-level packages
    #[must_use]
    pub fn top(&self) -> &BTreeMap<String, PackageDetails> {
        &self.top
    }

    /// Bottom-level packages
    #[must_use]
    pub fn bottom(&self) -> &BTreeMap<String, PackageDetails> {
        &self.bottom
    }

    /// Look up a package on either level
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PackageDetails> {
        self.top.get(id).or_else(|| self.bottom.get(id))
    }

    /// Look up a package on either level for modification
    pub fn get_mut(&mut self, id: &str) -> Option<&mut PackageDetails> {
        match self.top.get_mut(id) {
            Some(details) => Some(details),
            None => self.bottom.get_mut(id),
        }
    }

    /// Look up a package, failing when it is absent
    ///
    /// # Errors
    /// Returns [`CoreError::PackageNotFound`] for unknown identifiers.
    pub fn require(&self, id: &str) -> Result<&PackageDetails, CoreError> {
        self.get(id)
            .ok_or_else(|| CoreError::PackageNotFound(id.to_string()))
    }

    /// Whether the identifier is on either level
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.top.contains_key(id) || self.bottom.contains_key(id)
    }

    /// Level the identifier is on
    #[must_use]
    pub fn level_of(&self, id: &str) -> Option<Level> {
        if self.top.contains_key(id) {
            Some(Level::Top)
        } else if self.bottom.contains_key(id) {
            Some(Level::Bottom)
        } else {
            None
        }
    }

    /// Remove a package from whichever level holds it
    pub fn remove(&mut self, id: &str) -> Option<PackageDetails> {
        self.top.remove(id).or_else(|| self.bottom.remove(id))
    }

    /// Move a package from the bottom level to the top level
    ///
    /// # Errors
    /// Returns [`CoreError::PackageNotFound`] if it is not on the bottom level.
    pub fn move_up(&mut self, id: &str) -> Result<(), CoreError> {
        let details = self
            .bottom
            .remove(id)
            .ok_or_else(|| CoreError::PackageNotFound(id.to_string()))?;
        self.top.insert(id.to_string(), details);
        Ok(())
    }

    /// Move a package from the top level to the bottom level
    ///
    /// # Errors
    /// Returns [`CoreError::PackageNotFound`] if it is not on the top level.
    pub fn move_down(&mut self, id: &str) -> Result<(), CoreError> {
        let details = self
            .top
            .remove(id)
            .ok_or_else(|| CoreError::PackageNotFound(id.to_string()))?;
        self.bottom.insert(id.to_string(), details);
        Ok(())
    }

    /// Iterate over all packages, top level first
    pub fn iter(
        &self,
    ) -> std::iter::Chain<
        btree_map::Iter<'_, String, PackageDetails>,
        btree_map::Iter<'_, String, PackageDetails>,
    > {
        self.top.iter().chain(self.bottom.iter())
    }

    /// Iterate over all identifiers, top level first
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.top.keys().chain(self.bottom.keys())
    }

    /// Number of packages on both levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.top.len() + self.bottom.len()
    }

    /// Whether the collection holds no packages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }

    /// Every forward dependency between packages of the collection
    #[must_use]
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges = Vec::new();
        for (id, details) in self.iter() {
            for (kind, targets) in details.dependency_lists() {
                edges.extend(targets.iter().map(|to| DependencyEdge {
                    from: id.clone(),
                    to: to.clone(),
                    kind,
                }));
            }
        }
        edges
    }

    /// Fill in the recursive dependency sets of every package
    ///
    /// Dependencies that are not part of the collection are ignored.
    pub fn compute_recursive_dependencies(&mut self) {
        let closures: Vec<(String, BTreeSet<String>, BTreeSet<String>)> = self
            .ids()
            .map(|id| {
                let mut requires = dfs(id, |x| self.existing(x, &[EdgeKind::Requires]));
                requires.remove(id);

                let mut complements = dfs(id, |x| {
                    self.existing(x, &[EdgeKind::Requires, EdgeKind::Advises])
                });
                complements.remove(id);
                let complements = complements.difference(&requires).cloned().collect();

                (id.clone(), requires, complements)
            })
            .collect();

        for (id, requires, complements) in closures {
            for dependency in &requires {
                if let Some(details) = self.get_mut(dependency) {
                    details.recursive_what_requires.insert(id.clone());
                }
            }
            for dependency in &complements {
                if let Some(details) = self.get_mut(dependency) {
                    details.recursive_what_complements.insert(id.clone());
                }
            }
            if let Some(details) = self.get_mut(&id) {
                details.recursive_requires = requires;
                details.recursive_complements = complements;
            }
        }
    }

    /// Share the size of every bottom package among the top packages using it
    ///
    /// Must run after [`Self::compute_recursive_dependencies`].
    #[allow(clippy::cast_precision_loss)]
    pub fn compute_pseudobytes(&mut self) {
        let mut shares: Vec<(String, f64, bool)> = Vec::new();

        for details in self.bottom.values_mut() {
            let requirers: Vec<&String> = details
                .recursive_what_requires
                .iter()
                .filter(|x| self.top.contains_key(*x))
                .collect();
            let complementers: Vec<&String> = details
                .recursive_what_complements
                .iter()
                .filter(|x| self.top.contains_key(*x))
                .collect();

            let count = requirers.len() + complementers.len();
            if count > 0 {
                let size = details.installed_bytes as f64 / count as f64;
                shares.extend(requirers.into_iter().map(|id| (id.clone(), size, true)));
                shares.extend(complementers.into_iter().map(|id| (id.clone(), size, false)));
            }
            details.count = Some(count);
        }

        for (id, size, requires) in shares {
            if let Some(details) = self.top.get_mut(&id) {
                if requires {
                    details.r_requires_pseudobytes += size;
                } else {
                    details.r_complements_pseudobytes += size;
                }
            }
        }
    }

    /// Whether a bottom package is unreachable from every top package
    #[must_use]
    pub fn is_disconnected_from_top(&self, id: &str) -> bool {
        let Some(details) = self.bottom.get(id) else {
            return false;
        };
        !details
            .recursive_what_requires
            .union(&details.recursive_what_complements)
            .any(|x| self.top.contains_key(x))
    }

    /// Bottom packages unreachable from every top package
    #[must_use]
    pub fn disconnected_from_top(&self) -> BTreeSet<String> {
        let disconnected: BTreeSet<String> = self
            .bottom
            .keys()
            .filter(|id| self.is_disconnected_from_top(id))
            .cloned()
            .collect();
        debug!(count = disconnected.len(), "bottom packages disconnected from top");
        disconnected
    }

    fn existing(&self, id: &str, kinds: &[EdgeKind]) -> Vec<String> {
        let Some(details) = self.get(id) else {
            return Vec::new();
        };
        details
            .dependency_lists()
            .into_iter()
            .filter(|(kind, _)| kinds.contains(kind))
            .flat_map(|(_, targets)| targets.iter())
            .filter(|target| self.contains(target))
            .cloned()
            .collect()
    }

    fn level_map_mut(&mut self, level: Level) -> &mut BTreeMap<String, PackageDetails> {
        match level {
            Level::Top => &mut self.top,
            Level::Bottom => &mut self.bottom,
        }
    }
}

impl<'a> IntoIterator for &'a PackageCollection {
    type Item = (&'a String, &'a PackageDetails);
    type IntoIter = std::iter::Chain<
        btree_map::Iter<'a, String, PackageDetails>,
        btree_map::Iter<'a, String, PackageDetails>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// editor → libedit → libc, editor ⇢ docs, player → libc
    fn fixture() -> PackageCollection {
        let mut collection = PackageCollection::new();
        collection.add(
            Level::Top,
            "editor",
            PackageDetails::new("editor")
                .with_installed_bytes(100)
                .with_requires(["libedit"])
                .with_advises(["docs"]),
        );
        collection.add(
            Level::Top,
            "player",
            PackageDetails::new("player")
                .with_installed_bytes(50)
                .with_requires(["libc"]),
        );
        collection.add(
            Level::Bottom,
            "libedit",
            PackageDetails::new("libedit")
                .with_installed_bytes(30)
                .with_requires(["libc", "not-installed"]),
        );
        collection.add(
            Level::Bottom,
            "libc",
            PackageDetails::new("libc").with_installed_bytes(200),
        );
        collection.add(
            Level::Bottom,
            "docs",
            PackageDetails::new("docs").with_installed_bytes(10),
        );
        collection.add(
            Level::Bottom,
            "orphan",
            PackageDetails::new("orphan").with_installed_bytes(5),
        );
        collection
    }

    #[test]
    fn test_lookup_across_levels() {
        let collection = fixture();

        assert_eq!(collection.len(), 6);
        assert_eq!(collection.level_of("editor"), Some(Level::Top));
        assert_eq!(collection.level_of("libc"), Some(Level::Bottom));
        assert_eq!(collection.level_of("missing"), None);
        assert!(collection.require("missing").is_err());
    }

    #[test]
    fn test_add_replaces_across_levels() {
        let mut collection = fixture();
        collection.add(Level::Top, "libc", PackageDetails::new("libc"));

        assert_eq!(collection.level_of("libc"), Some(Level::Top));
        assert_eq!(collection.len(), 6);
    }

    #[test]
    fn test_move_up_and_down() {
        let mut collection = fixture();

        collection.move_up("orphan").unwrap();
        assert_eq!(collection.level_of("orphan"), Some(Level::Top));

        collection.move_down("orphan").unwrap();
        assert_eq!(collection.level_of("orphan"), Some(Level::Bottom));

        assert!(collection.move_down("orphan").is_err());
    }

    #[test]
    fn test_recursive_dependencies() {
        let mut collection = fixture();
        collection.compute_recursive_dependencies();

        let editor = collection.get("editor").unwrap();
        let expected: BTreeSet<String> =
            ["libc", "libedit"].iter().map(|s| (*s).to_string()).collect();
        assert_eq!(editor.recursive_requires, expected);
        assert!(editor.recursive_complements.contains("docs"));
        assert_eq!(editor.recursive_complements.len(), 1);

        let libc = collection.get("libc").unwrap();
        assert!(libc.recursive_what_requires.contains("editor"));
        assert!(libc.recursive_what_requires.contains("player"));
        assert!(libc.recursive_what_requires.contains("libedit"));

        let docs = collection.get("docs").unwrap();
        assert!(docs.recursive_what_complements.contains("editor"));
        assert!(docs.recursive_what_requires.is_empty());
    }

    #[test]
    fn test_pseudobytes_are_shared() {
        let mut collection = fixture();
        collection.compute_recursive_dependencies();
        collection.compute_pseudobytes();

        let editor = collection.get("editor").unwrap();
        // libedit (30) alone plus half of libc (200)
        assert!((editor.r_requires_pseudobytes - 130.0).abs() < 1e-9);
        assert!((editor.r_complements_pseudobytes - 10.0).abs() < 1e-9);

        let player = collection.get("player").unwrap();
        assert!((player.r_requires_pseudobytes - 100.0).abs() < 1e-9);

        assert_eq!(collection.get("libc").unwrap().count, Some(2));
        assert_eq!(collection.get("orphan").unwrap().count, Some(0));
    }

    #[test]
    fn test_connected_bytes_are_conserved() {
        let mut collection = fixture();
        collection.compute_recursive_dependencies();
        collection.compute_pseudobytes();

        let top_bytes: f64 = collection.top().values().map(PackageDetails::all_bytes).sum();
        #[allow(clippy::cast_precision_loss)]
        let connected: f64 = collection
            .iter()
            .filter(|(_, details)| details.count != Some(0))
            .map(|(_, details)| details.installed_bytes as f64)
            .sum();
        assert!((top_bytes - connected).abs() < 1e-9);
    }

    #[test]
    fn test_byte_ratios() {
        let mut collection = fixture();
        collection.compute_recursive_dependencies();
        collection.compute_pseudobytes();

        let (installed, requires, complements) =
            collection.get("editor").unwrap().byte_ratios().unwrap();
        assert!((installed + requires + complements - 1.0).abs() < 1e-12);
        assert!((installed - 100.0 / 240.0).abs() < 1e-12);

        assert!(PackageDetails::new("empty").byte_ratios().is_none());
    }

    #[test]
    fn test_disconnected_from_top() {
        let mut collection = fixture();
        collection.compute_recursive_dependencies();

        let disconnected = collection.disconnected_from_top();
        assert_eq!(disconnected.len(), 1);
        assert!(disconnected.contains("orphan"));
        assert!(!collection.is_disconnected_from_top("editor"));
    }

    #[test]
    fn test_edges() {
        let collection = fixture();
        let edges = collection.edges();

        assert!(edges.contains(&DependencyEdge {
            from: "editor".to_string(),
            to: "docs".to_string(),
            kind: EdgeKind::Advises,
        }));
        assert_eq!(
            edges
                .iter()
                .filter(|edge| edge.kind == EdgeKind::Requires)
                .count(),
            4
        );
    }
}
