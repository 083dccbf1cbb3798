//! APT collector (Debian/Ubuntu)
//!
//! Guesses which packages were explicitly user-installed, assuming the
//! manual/automatic marks are also used for other purposes and that the
//! history logs may be incomplete.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::SystemTime;

use async_trait::async_trait;
use dabs_core::graph::dfs;
use dabs_core::{Level, PackageCollection, PackageDetails};
use dabs_exec::CommandExecutor;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::error::PackageError;
use crate::{parse_size, query};
use crate::traits::Collector;
use crate::types::{CollectorConfig, PackageManagerType};

const DPKG_FORMAT: &str = "${Package}\\t${Architecture}\\t${Version}\\t${Installed-Size}\\t\
${db:Status-Abbrev}\\t${Priority}\\t${Section}\\t${Depends}\\t${Pre-Depends}\\t\
${Recommends}\\t${Suggests}\\t${Enhances}\\t${Provides}\\t${binary:Summary}\\n";

const DPKG_FIELDS: usize = 14;

static HISTORY_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^:,\s]+):(\S+) \(([^)]*)\)").expect("history entry pattern is valid")
});

/// One alternative of a dependency OR-group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyAtom {
    /// Package or virtual package name
    pub name: String,
    /// Explicit architecture qualifier (`:any`/`:native` are dropped)
    pub arch: Option<String>,
}

/// OR-groups of a dependency field
pub type DependencyField = Vec<Vec<DependencyAtom>>;

/// An installed package as reported by `dpkg-query`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DpkgPackage {
    pub name: String,
    /// Architecture, with `all` replaced by the native one as APT does
    pub arch: String,
    pub version: String,
    pub installed_kib: u64,
    pub priority: String,
    pub section: String,
    pub depends: DependencyField,
    pub pre_depends: DependencyField,
    pub recommends: DependencyField,
    pub suggests: DependencyField,
    pub enhances: DependencyField,
    pub provides: Vec<String>,
    pub summary: String,
}

impl DpkgPackage {
    /// `name:arch` identifier
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.name, self.arch)
    }

    /// Priority `required`, `important` or `standard`, or a task package
    fn is_base_system(&self) -> bool {
        matches!(
            self.priority.as_str(),
            "required" | "important" | "standard"
        ) || self.section == "tasks"
    }

    fn is_library(&self) -> bool {
        self.section == "libs" || self.section.ends_with("/libs")
    }
}

/// Packages classified by the APT history logs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AptHistory {
    /// Installed on user request, not automatically
    pub manual: BTreeSet<String>,
    /// Installed automatically on user request
    pub auto: BTreeSet<String>,
    /// Touched by transactions without a requesting user (installer, OS)
    pub os: BTreeSet<String>,
}

/// Inputs of the user-package filter
#[derive(Debug, Clone, Default)]
pub struct AptSets {
    /// Every installed package
    pub installed: BTreeSet<String>,
    /// Installed packages not marked automatic
    pub manual: BTreeSet<String>,
    /// Base system packages and their recursive dependencies
    pub os: BTreeSet<String>,
    /// Libraries that never appear as manual installs in the history
    pub ahistorical_libs: BTreeSet<String>,
    /// History classification
    pub history: AptHistory,
}

/// Outcome of the user-package filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Packages not belonging to the base system
    pub user_packages: BTreeSet<String>,
    /// Presumed explicitly user-installed
    pub top: BTreeSet<String>,
    /// User packages present only as dependencies
    pub bottom: BTreeSet<String>,
}

/// Separate user-installed packages from dependency-only ones
#[must_use]
pub fn classify(sets: &AptSets) -> Classification {
    let user_packages: BTreeSet<String> = sets
        .installed
        .iter()
        .filter(|id| !sets.os.contains(*id) && !sets.history.os.contains(*id))
        .cloned()
        .collect();

    let top: BTreeSet<String> = sets
        .manual
        .iter()
        .filter(|id| {
            !sets.os.contains(*id)
                && !sets.ahistorical_libs.contains(*id)
                && !sets.history.os.contains(*id)
                && !sets.history.auto.contains(*id)
        })
        .cloned()
        .collect();

    let bottom = user_packages.difference(&top).cloned().collect();

    Classification {
        user_packages,
        top,
        bottom,
    }
}

/// Parse a Debian dependency field such as `libc6 (>= 2.34), foo | bar:any`
#[must_use]
pub fn parse_dependency_field(field: &str) -> DependencyField {
    field
        .split(',')
        .map(|group| {
            group
                .split('|')
                .filter_map(|alternative| {
                    let token = alternative
                        .trim()
                        .split(|c: char| c.is_whitespace() || c == '(' || c == '[')
                        .next()
                        .unwrap_or_default();
                    if token.is_empty() {
                        return None;
                    }
                    let (name, arch) = match token.split_once(':') {
                        Some((name, "any" | "native")) => (name, None),
                        Some((name, arch)) => (name, Some(arch.to_string())),
                        None => (token, None),
                    };
                    Some(DependencyAtom {
                        name: name.to_string(),
                        arch,
                    })
                })
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Parse `dpkg-query` output, keeping installed packages only
///
/// Architecture-independent packages are filed under `native_arch`, the form
/// in which the APT history logs and `apt-mark` name them.
///
/// # Errors
/// Returns [`PackageError::ParseError`] for lines with missing fields or a
/// malformed size.
pub fn parse_dpkg_output(
    output: &str,
    native_arch: &str,
) -> Result<Vec<DpkgPackage>, PackageError> {
    let mut packages = Vec::new();

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        let fields: Vec<&str> = line.splitn(DPKG_FIELDS, '\t').collect();
        if fields.len() < DPKG_FIELDS {
            return Err(PackageError::ParseError(format!(
                "unexpected dpkg-query line: {line}"
            )));
        }

        // Second status letter is the current state
        if fields[4].chars().nth(1) != Some('i') {
            continue;
        }

        let arch = match fields[1] {
            "all" => native_arch,
            arch => arch,
        };
        packages.push(DpkgPackage {
            name: fields[0].to_string(),
            arch: arch.to_string(),
            version: fields[2].to_string(),
            installed_kib: parse_size(fields[3], fields[0])?,
            priority: fields[5].to_string(),
            section: fields[6].to_string(),
            depends: parse_dependency_field(fields[7]),
            pre_depends: parse_dependency_field(fields[8]),
            recommends: parse_dependency_field(fields[9]),
            suggests: parse_dependency_field(fields[10]),
            enhances: parse_dependency_field(fields[11]),
            provides: parse_dependency_field(fields[12])
                .into_iter()
                .flatten()
                .map(|atom| atom.name)
                .collect(),
            summary: fields[13].to_string(),
        });
    }

    Ok(packages)
}

/// Parse concatenated APT history logs, oldest first
#[must_use]
pub fn parse_history(content: &str) -> AptHistory {
    let mut history = AptHistory::default();

    for stanza in content.split("\n\n") {
        let fields: HashMap<&str, &str> = stanza
            .lines()
            .filter_map(|line| line.split_once(": "))
            .map(|(key, value)| (key.trim(), value))
            .collect();
        let requested = fields.contains_key("Requested-By");

        for operation in ["Install", "Remove", "Purge"] {
            let Some(value) = fields.get(operation) else {
                continue;
            };
            for entry in HISTORY_ENTRY.captures_iter(value) {
                let identifier = format!("{}:{}", &entry[1], &entry[2]);
                let automatic = entry[3].ends_with("automatic");

                if !requested {
                    history.os.insert(identifier);
                    continue;
                }
                match (operation == "Install", automatic) {
                    (true, false) => {
                        history.manual.insert(identifier);
                    }
                    (true, true) => {
                        history.auto.insert(identifier);
                    }
                    (false, false) => {
                        history.manual.remove(&identifier);
                    }
                    (false, true) => {
                        history.auto.remove(&identifier);
                    }
                }
            }
        }
    }

    history
}

/// Resolves dependency atoms against the installed packages
struct Resolver<'a> {
    by_name: HashMap<&'a str, Vec<&'a DpkgPackage>>,
    providers: HashMap<&'a str, Vec<&'a DpkgPackage>>,
}

impl<'a> Resolver<'a> {
    fn new(packages: &'a [DpkgPackage]) -> Self {
        let mut by_name: HashMap<&str, Vec<&DpkgPackage>> = HashMap::new();
        let mut providers: HashMap<&str, Vec<&DpkgPackage>> = HashMap::new();
        for package in packages {
            by_name.entry(package.name.as_str()).or_default().push(package);
            for virtual_name in &package.provides {
                providers
                    .entry(virtual_name.as_str())
                    .or_default()
                    .push(package);
            }
        }
        Self { by_name, providers }
    }

    /// Installed candidates for an atom, best match first
    fn candidates(&self, atom: &DependencyAtom, depender_arch: &str) -> Vec<String> {
        let mut direct: Vec<&DpkgPackage> = self
            .by_name
            .get(atom.name.as_str())
            .cloned()
            .unwrap_or_default();
        if let Some(arch) = &atom.arch {
            direct.retain(|package| &package.arch == arch);
        }
        direct.sort_by_key(|package| package.arch != depender_arch);

        let provided = self
            .providers
            .get(atom.name.as_str())
            .into_iter()
            .flatten();

        direct
            .into_iter()
            .chain(provided.copied())
            .map(DpkgPackage::identifier)
            .collect()
    }

    /// First installed, allowed alternative of every OR-group
    fn resolve(
        &self,
        field: &DependencyField,
        depender_arch: &str,
        allowed: Option<&BTreeSet<String>>,
    ) -> Vec<String> {
        let mut resolved = Vec::new();
        for group in field {
            let chosen = group.iter().find_map(|atom| {
                self.candidates(atom, depender_arch)
                    .into_iter()
                    .find(|id| allowed.is_none_or(|allowed| allowed.contains(id)))
            });
            match chosen {
                Some(id) if !resolved.contains(&id) => resolved.push(id),
                _ => {}
            }
        }
        resolved
    }

    /// Depends, Pre-Depends and Recommends without restriction
    fn strong_dependencies(&self, package: &DpkgPackage) -> Vec<String> {
        [&package.depends, &package.pre_depends, &package.recommends]
            .into_iter()
            .flat_map(|field| self.resolve(field, &package.arch, None))
            .collect()
    }
}

/// Build the filter inputs from the raw package data
#[must_use]
pub fn build_sets(
    packages: &[DpkgPackage],
    auto_marked: &BTreeSet<String>,
    history: AptHistory,
) -> AptSets {
    let resolver = Resolver::new(packages);
    let by_id: HashMap<String, &DpkgPackage> = packages
        .iter()
        .map(|package| (package.identifier(), package))
        .collect();

    let mut sets = AptSets {
        history,
        ..AptSets::default()
    };

    for package in packages {
        let id = package.identifier();

        if package.is_base_system() {
            let closure = dfs(&id, |x| {
                by_id
                    .get(x)
                    .map(|package| resolver.strong_dependencies(package))
                    .unwrap_or_default()
            });
            sets.os.extend(closure);
        } else if package.is_library() && !sets.history.manual.contains(&id) {
            sets.ahistorical_libs.insert(id.clone());
        }

        if is_auto_marked(package, auto_marked) {
            debug!(package = %id, "marked automatic");
        } else {
            sets.manual.insert(id.clone());
        }
        sets.installed.insert(id);
    }

    sets
}

fn is_auto_marked(package: &DpkgPackage, auto_marked: &BTreeSet<String>) -> bool {
    auto_marked.contains(&package.name) || auto_marked.contains(&package.identifier())
}

/// Assemble the collection from classified packages
#[must_use]
pub fn assemble(
    packages: &[DpkgPackage],
    auto_marked: &BTreeSet<String>,
    classification: &Classification,
) -> PackageCollection {
    let resolver = Resolver::new(packages);
    let by_id: BTreeMap<String, &DpkgPackage> = packages
        .iter()
        .map(|package| (package.identifier(), package))
        .collect();
    let allowed = Some(&classification.user_packages);

    let mut collection = PackageCollection::new();
    for (level, ids) in [
        (Level::Top, &classification.top),
        (Level::Bottom, &classification.bottom),
    ] {
        for id in ids {
            let Some(package) = by_id.get(id) else {
                continue;
            };
            let arch = package.arch.as_str();

            let mut requires = resolver.resolve(&package.depends, arch, allowed);
            for id in resolver.resolve(&package.pre_depends, arch, allowed) {
                if !requires.contains(&id) {
                    requires.push(id);
                }
            }

            let mut details = PackageDetails::new(package.name.clone())
                .with_version(package.version.clone())
                .with_category(package.section.clone())
                .with_description(package.summary.clone())
                .with_installed_bytes(package.installed_kib * 1024)
                .with_auto_installed(is_auto_marked(package, auto_marked))
                .with_requires(requires)
                .with_advises(resolver.resolve(&package.recommends, arch, allowed));
            details.suggests = Some(resolver.resolve(&package.suggests, arch, allowed));
            details.enhances = Some(resolver.resolve(&package.enhances, arch, allowed));

            collection.add(level, id.clone(), details);
        }
    }

    collection
}

/// APT collector implementation
pub struct AptCollector {
    /// Executor for running dpkg/apt query tools
    executor: Arc<dyn CommandExecutor>,
    config: CollectorConfig,
}

impl AptCollector {
    /// Create a new APT collector
    pub fn new(executor: Arc<dyn CommandExecutor>, config: CollectorConfig) -> Self {
        Self { executor, config }
    }

    async fn native_architecture(&self) -> Result<String, PackageError> {
        let output = query(
            self.executor.as_ref(),
            "dpkg",
            &["--print-architecture"],
            self.config.timeout(),
        )
        .await?;
        let arch = output.trim();
        if arch.is_empty() {
            return Err(PackageError::ParseError(
                "dpkg printed no native architecture".to_string(),
            ));
        }
        Ok(arch.to_string())
    }

    async fn installed_packages(&self) -> Result<Vec<DpkgPackage>, PackageError> {
        let native_arch = self.native_architecture().await?;
        debug!(%native_arch, "native architecture");
        let format = format!("--showformat={DPKG_FORMAT}");
        let output = query(
            self.executor.as_ref(),
            "dpkg-query",
            &["-W", &format],
            self.config.timeout(),
        )
        .await?;
        parse_dpkg_output(&output, &native_arch)
    }

    async fn auto_marked(&self) -> Result<BTreeSet<String>, PackageError> {
        let output = query(
            self.executor.as_ref(),
            "apt-mark",
            &["showauto"],
            self.config.timeout(),
        )
        .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// History log and its rotated siblings, oldest first
    fn history_files(&self) -> Vec<PathBuf> {
        let history = &self.config.apt_history;
        let Some(stem) = history.file_stem().and_then(|s| s.to_str()) else {
            return Vec::new();
        };
        let directory = history.parent().unwrap_or_else(|| Path::new("/"));

        let Ok(entries) = fs::read_dir(directory) else {
            debug!(path = %directory.display(), "no APT log directory");
            return Vec::new();
        };

        let mut files: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(stem))
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                metadata
                    .is_file()
                    .then(|| (metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH), entry.path()))
            })
            .collect();
        files.sort();
        files.into_iter().map(|(_, path)| path).collect()
    }

    async fn history(&self) -> AptHistory {
        let files = self.history_files();
        if files.is_empty() {
            warn!("no APT history found, relying on manual marks only");
            return AptHistory::default();
        }

        let paths: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        let mut args = vec!["-f"];
        args.extend(paths.iter().map(String::as_str));

        // zcat exits non-zero if any single file is unreadable; keep what it read
        match self
            .executor
            .run("zcat", &args, self.config.timeout())
            .await
        {
            Ok(result) => {
                if !result.success() {
                    warn!(
                        stderr = %result.stderr.trim(),
                        "some APT history logs could not be read"
                    );
                }
                parse_history(&result.stdout)
            }
            Err(e) => {
                warn!(error = %e, "failed to read APT history");
                AptHistory::default()
            }
        }
    }
}

#[async_trait]
impl Collector for AptCollector {
    #[instrument(skip(self))]
    async fn collect(&self) -> Result<PackageCollection, PackageError> {
        debug!("collecting APT packages");

        let packages = self.installed_packages().await?;
        let auto_marked = self.auto_marked().await?;
        let history = self.history().await;

        let sets = build_sets(&packages, &auto_marked, history);
        let classification = classify(&sets);
        info!(
            installed = sets.installed.len(),
            base_system = sets.os.len(),
            top = classification.top.len(),
            bottom = classification.bottom.len(),
            "classified APT packages"
        );

        Ok(assemble(&packages, &auto_marked, &classification))
    }

    /// Prune bottom-level packages disconnected from the top level
    fn post_process(&self, collection: &mut PackageCollection) {
        let disconnected = collection.disconnected_from_top();
        for id in &disconnected {
            collection.remove(id);
        }
        debug!(removed = ?disconnected, "Removed in post-process");
    }

    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Apt
    }

    fn is_available(&self) -> bool {
        ["dpkg", "dpkg-query", "apt-mark"]
            .iter()
            .all(|program| which::which(program).is_ok())
    }
}
