//! Flatpak collector
//!
//! Apps are top-level and require their runtime. Extensions are found by
//! matching the extension points declared in each ref's metadata against the
//! installed refs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use dabs_core::convert::human_to_bytes;
use dabs_core::{Level, PackageCollection, PackageDetails, Variety};
use dabs_exec::CommandExecutor;
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::PackageError;
use crate::query;
use crate::traits::Collector;
use crate::types::{CollectorConfig, PackageManagerType};

const COLUMNS: [&str; 8] = [
    "ref",
    "name",
    "runtime",
    "branch",
    "size",
    "installation",
    "active",
    "description",
];

static HIDDEN_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\.(?:Locale|Debug)/.*/.*").expect("hidden extension pattern is valid")
});

static EXTENSION_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Extension ([^@]*)@?(.*)$").expect("extension group pattern is valid")
});

/// One row of `flatpak list`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatpakRow {
    pub reference: String,
    pub name: String,
    pub runtime: String,
    pub branch: String,
    pub size: String,
    pub installation: String,
    pub active: String,
    pub description: String,
}

/// An extension point declared in a ref's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPoint {
    /// Id prefix of the extensions
    pub name: String,
    /// Accepted branches, in order of preference
    pub versions: Vec<String>,
}

/// Parse tab-separated `flatpak list` output; missing trailing cells are empty
#[must_use]
pub fn parse_list(output: &str) -> Vec<FlatpakRow> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut cells = line.split('\t').map(str::to_string);
            let mut next = || cells.next().unwrap_or_default();
            FlatpakRow {
                reference: next(),
                name: next(),
                runtime: next(),
                branch: next(),
                size: next(),
                installation: next(),
                active: next(),
                description: next(),
            }
        })
        .collect()
}

/// Display name, with the branch appended unless it is redundant
#[must_use]
pub fn label(name: &str, branch: &str) -> String {
    if name.ends_with(branch) || branch.starts_with("stable") {
        name.to_string()
    } else {
        format!("{name} {branch}")
    }
}

/// Branch component of a ref
fn branch_of(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or_default()
}

/// Extension points declared by a keyfile, defaulting versions to the owner's branch
#[must_use]
pub fn parse_extension_points(metadata: &str, owner_ref: &str) -> Vec<ExtensionPoint> {
    let mut groups: Vec<(String, BTreeMap<String, String>)> = Vec::new();

    for line in metadata.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(group) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            groups.push((group.to_string(), BTreeMap::new()));
        } else if let (Some((key, value)), Some((_, entries))) =
            (line.split_once('='), groups.last_mut())
        {
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    groups
        .into_iter()
        .filter_map(|(group, entries)| {
            let name = EXTENSION_GROUP.captures(&group)?.get(1)?.as_str().to_string();

            let mut versions: Vec<String> = entries
                .get("versions")
                .map(|v| v.split(';').map(str::to_string).collect())
                .unwrap_or_default();
            if let Some(version) = entries.get("version") {
                if !versions.contains(version) {
                    versions.push(version.clone());
                }
            }
            versions.push(branch_of(owner_ref).to_string());
            versions.retain(|v| !v.is_empty());

            Some(ExtensionPoint { name, versions })
        })
        .collect()
}

/// Installed refs matching an owner's extension points
#[must_use]
pub fn resolve_extension_points<'a, I>(points: &[ExtensionPoint], refs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String> + Clone,
{
    let mut extensions = Vec::new();

    for point in points {
        let mut candidates: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for reference in refs.clone() {
            let Some(rest) = reference.strip_prefix(&point.name) else {
                continue;
            };
            if !(rest.starts_with('.') || rest.starts_with('/')) {
                continue;
            }
            if let Some((id_arch, version)) = reference.rsplit_once('/') {
                candidates.entry(id_arch).or_default().push(version);
            }
        }

        for (id_arch, installed) in candidates {
            for version in point.versions.iter().filter(|v| installed.contains(&v.as_str())) {
                let extension = format!("{id_arch}/{version}");
                if !extensions.contains(&extension) {
                    extensions.push(extension);
                }
            }
        }
    }

    extensions
}

/// Build the collection from `flatpak list` rows, before extension resolution
///
/// # Errors
/// Returns [`PackageError::ParseError`] when a size cannot be read.
pub fn assemble(rows: &[FlatpakRow]) -> Result<PackageCollection, PackageError> {
    let mut collection = PackageCollection::new();

    for row in rows {
        let (level, variety) = if !row.runtime.is_empty() {
            (Level::Top, Variety::App)
        } else if HIDDEN_EXTENSION.is_match(&row.reference) {
            (Level::Bottom, Variety::HiddenExtension)
        } else {
            (Level::Bottom, Variety::Runtime)
        };

        let bytes = human_to_bytes(&row.size)
            .map_err(|e| PackageError::ParseError(format!("{}: {e}", row.reference)))?;

        let mut details = PackageDetails::new(label(&row.name, &row.branch))
            .with_description(row.description.clone())
            .with_installed_bytes(bytes)
            .with_requires(
                Some(row.runtime.clone()).filter(|runtime| !runtime.is_empty()),
            );
        details.variety = Some(variety);
        details.installation = Some(row.installation.clone());

        collection.add(level, row.reference.clone(), details);
    }

    Ok(collection)
}

/// Attach resolved extensions to their owner
///
/// Hidden extensions are folded into the owner's size; the others become
/// advised runtime extensions.
pub fn attach_extensions(collection: &mut PackageCollection, owner: &str, extensions: &[String]) {
    for extension in extensions {
        if extension == owner {
            continue;
        }
        let Some(details) = collection.get_mut(extension) else {
            continue;
        };

        if details.variety == Some(Variety::HiddenExtension) {
            let bytes = std::mem::take(&mut details.installed_bytes);
            if let Some(owner) = collection.get_mut(owner) {
                owner.installed_bytes += bytes;
            }
        } else {
            details.variety = Some(Variety::RuntimeExtension);
            if let Some(owner) = collection.get_mut(owner) {
                if !owner.advises.contains(extension) {
                    owner.advises.push(extension.clone());
                }
            }
        }
    }
}

/// Flatpak collector implementation
pub struct FlatpakCollector {
    /// Executor for running flatpak
    executor: Arc<dyn CommandExecutor>,
    config: CollectorConfig,
}

impl FlatpakCollector {
    /// Create a new Flatpak collector
    pub fn new(executor: Arc<dyn CommandExecutor>, config: CollectorConfig) -> Self {
        Self { executor, config }
    }

    fn installation_dir(&self, installation: &str) -> PathBuf {
        if installation == "user" {
            self.config.flatpak_user_dir()
        } else {
            self.config.flatpak_system_dir.clone()
        }
    }

    async fn extension_points(
        &self,
        reference: &str,
        details: &PackageDetails,
    ) -> Vec<ExtensionPoint> {
        let kind = details.variety.map_or("runtime", Variety::kind);
        let path = self
            .installation_dir(details.installation.as_deref().unwrap_or_default())
            .join(kind)
            .join(reference)
            .join("active/metadata");

        match tokio::fs::read_to_string(&path).await {
            Ok(metadata) => parse_extension_points(&metadata, reference),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no readable metadata");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Collector for FlatpakCollector {
    #[instrument(skip(self))]
    async fn collect(&self) -> Result<PackageCollection, PackageError> {
        debug!("collecting Flatpak refs");

        let columns = format!("--columns={}", COLUMNS.join(","));
        let output = query(
            self.executor.as_ref(),
            "flatpak",
            &["list", "--all", &columns],
            self.config.timeout(),
        )
        .await?;
        let mut collection = assemble(&parse_list(&output))?;

        let refs: Vec<String> = collection.ids().cloned().collect();
        for reference in &refs {
            let Some(details) = collection.get(reference) else {
                continue;
            };
            let points = self.extension_points(reference, details).await;
            let extensions = resolve_extension_points(&points, refs.iter());
            attach_extensions(&mut collection, reference, &extensions);
        }

        Ok(collection)
    }

    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Flatpak
    }

    fn is_available(&self) -> bool {
        which::which("flatpak").is_ok()
    }
}
