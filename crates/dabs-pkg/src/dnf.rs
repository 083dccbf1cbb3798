//! DNF collector (Fedora/RHEL)
//!
//! Install reasons come from `dnf repoquery`, package data and capabilities
//! from `rpm`. The user mark is assumed to be incomplete, so `post_process`
//! promotes packages that nothing installed depends on.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use dabs_core::{Level, PackageCollection, PackageDetails};
use dabs_exec::CommandExecutor;
use tracing::{debug, instrument, warn};

use crate::error::PackageError;
use crate::{parse_size, query};
use crate::traits::Collector;
use crate::types::{CollectorConfig, PackageManagerType};

const REASON_FORMAT: &str = "%{name}\\t%{arch}\\t%{reason}\\n";

const PACKAGE_FORMAT: &str =
    "%{NAME}\\t%{ARCH}\\t%{VERSION}-%{RELEASE}\\t%{SIZE}\\t%{GROUP}\\t%{SUMMARY}\\n";

const CAPABILITY_FORMAT: &str = "[%{=NAME}\\t%{=ARCH}\\tprovides\\t%{PROVIDENAME}\\n]\
[%{=NAME}\\t%{=ARCH}\\trequires\\t%{REQUIRENAME}\\n]\
[%{=NAME}\\t%{=ARCH}\\trecommends\\t%{RECOMMENDNAME}\\n]\
[%{=NAME}\\t%{=ARCH}\\tsuggests\\t%{SUGGESTNAME}\\n]\
[%{=NAME}\\t%{=ARCH}\\tsupplements\\t%{SUPPLEMENTNAME}\\n]\
[%{=NAME}\\t%{=ARCH}\\tenhances\\t%{ENHANCENAME}\\n]";

/// An installed RPM package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpmPackage {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub size: u64,
    pub group: String,
    pub summary: String,
}

impl RpmPackage {
    /// `name:arch` identifier
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.name, self.arch)
    }
}

/// Capabilities of one package, by relationship
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub recommends: Vec<String>,
    pub suggests: Vec<String>,
    pub supplements: Vec<String>,
    pub enhances: Vec<String>,
}

/// Parse `name\tarch\treason` lines into identifier → reason
#[must_use]
pub fn parse_reasons(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let mut cells = line.split('\t');
            let name = cells.next()?.trim();
            let arch = cells.next()?.trim();
            let reason = cells.next()?.trim();
            (!name.is_empty()).then(|| (format!("{name}:{arch}"), reason.to_string()))
        })
        .collect()
}

/// Parse the package listing
///
/// # Errors
/// Returns [`PackageError::ParseError`] for lines with missing fields or a
/// malformed size.
pub fn parse_packages(output: &str) -> Result<Vec<RpmPackage>, PackageError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let cells: Vec<&str> = line.splitn(6, '\t').collect();
            let [name, arch, version, size, group, summary] = cells[..] else {
                return Err(PackageError::ParseError(format!(
                    "unexpected rpm line: {line}"
                )));
            };
            Ok(RpmPackage {
                name: name.to_string(),
                arch: arch.to_string(),
                version: version.to_string(),
                size: parse_size(size, name)?,
                group: group.to_string(),
                summary: summary.to_string(),
            })
        })
        .collect()
}

/// Parse `name\tarch\trelation\tcapability` lines into identifier → capabilities
#[must_use]
pub fn parse_capabilities(output: &str) -> HashMap<String, Capabilities> {
    let mut capabilities: HashMap<String, Capabilities> = HashMap::new();

    for line in output.lines() {
        let mut cells = line.splitn(4, '\t');
        let (Some(name), Some(arch), Some(relation), Some(capability)) =
            (cells.next(), cells.next(), cells.next(), cells.next())
        else {
            continue;
        };
        // Packages without a given tag print "(none)"
        if capability.is_empty() || capability == "(none)" {
            continue;
        }

        let entry = capabilities.entry(format!("{name}:{arch}")).or_default();
        let list = match relation {
            "provides" => &mut entry.provides,
            "requires" => &mut entry.requires,
            "recommends" => &mut entry.recommends,
            "suggests" => &mut entry.suggests,
            "supplements" => &mut entry.supplements,
            "enhances" => &mut entry.enhances,
            _ => continue,
        };
        if !list.iter().any(|c| c == capability) {
            list.push(capability.to_string());
        }
    }

    capabilities
}

/// Whether a package is left out of the collection
fn is_excluded(package: &RpmPackage, reason: &str) -> bool {
    reason == "group"
        || package.name.starts_with("kernel")
        || package.name.starts_with("glib")
}

/// Install reason of a package that belongs in the collection
///
/// Packages unknown to DNF, such as the `gpg-pubkey` entries of imported
/// signing keys, are left out.
fn kept_reason<'a>(package: &RpmPackage, reasons: &'a HashMap<String, String>) -> Option<&'a str> {
    let reason = reasons.get(&package.identifier())?.as_str();
    (!is_excluded(package, reason)).then_some(reason)
}

/// Maps capabilities to the kept packages providing them
#[derive(Debug, Default)]
pub struct ProviderIndex {
    providers: HashMap<String, BTreeSet<String>>,
    names: HashMap<String, String>,
}

impl ProviderIndex {
    /// Index the provides of every kept package
    #[must_use]
    pub fn new(packages: &[&RpmPackage], capabilities: &HashMap<String, Capabilities>) -> Self {
        let mut index = Self::default();
        for package in packages {
            let id = package.identifier();
            index.names.insert(id.clone(), package.name.clone());
            // A package always provides its own name
            index.add(&package.name, &id);
            if let Some(caps) = capabilities.get(&id) {
                for capability in &caps.provides {
                    index.add(capability, &id);
                }
            }
        }
        index
    }

    /// Register an additional provider, e.g. the owner of a file
    pub fn add(&mut self, capability: &str, id: &str) {
        self.providers
            .entry(capability.to_string())
            .or_default()
            .insert(id.to_string());
    }

    /// Whether the package was indexed
    #[must_use]
    pub fn is_kept(&self, id: &str) -> bool {
        self.names.contains_key(id)
    }

    /// Whether anything provides the capability
    #[must_use]
    pub fn provides(&self, capability: &str) -> bool {
        self.providers.contains_key(capability)
    }

    /// Providers of any of the capabilities, except packages named `exclude_name`
    #[must_use]
    pub fn resolve(&self, capabilities: &[String], exclude_name: &str) -> Vec<String> {
        let resolved: BTreeSet<&String> = capabilities
            .iter()
            .filter_map(|capability| self.providers.get(capability))
            .flatten()
            .filter(|id| self.names.get(*id).is_none_or(|name| name != exclude_name))
            .collect();
        resolved.into_iter().cloned().collect()
    }
}

/// Assemble the collection from the parsed query results
#[must_use]
pub fn assemble(
    packages: &[RpmPackage],
    reasons: &HashMap<String, String>,
    capabilities: &HashMap<String, Capabilities>,
    index: &ProviderIndex,
) -> PackageCollection {
    let empty = Capabilities::default();
    let mut collection = PackageCollection::new();

    for package in packages {
        let Some(reason) = kept_reason(package, reasons) else {
            debug!(package = %package.identifier(), "not collected");
            continue;
        };
        let id = package.identifier();

        let caps = capabilities.get(&id).unwrap_or(&empty);
        let resolve = |list: &[String]| index.resolve(list, &package.name);

        let mut details = PackageDetails::new(package.name.clone())
            .with_version(package.version.clone())
            .with_description(package.summary.clone())
            .with_installed_bytes(package.size)
            .with_auto_installed(reason != "user")
            .with_requires(resolve(&caps.requires))
            .with_advises(resolve(&caps.recommends));
        if !package.group.is_empty() && package.group != "Unspecified" {
            details.category = Some(package.group.clone());
        }
        details.suggests = Some(resolve(&caps.suggests));
        details.supplements = Some(resolve(&caps.supplements));
        details.enhances = Some(resolve(&caps.enhances));

        let level = if reason == "user" {
            Level::Top
        } else {
            Level::Bottom
        };
        collection.add(level, id, details);
    }

    collection
}

/// DNF collector implementation
pub struct DnfCollector {
    /// Executor for running dnf/rpm
    executor: Arc<dyn CommandExecutor>,
    config: CollectorConfig,
}

impl DnfCollector {
    /// Create a new DNF collector
    pub fn new(executor: Arc<dyn CommandExecutor>, config: CollectorConfig) -> Self {
        Self { executor, config }
    }

    async fn rpm_query(&self, format: &str) -> Result<String, PackageError> {
        let format = format!("--queryformat={format}");
        query(
            self.executor.as_ref(),
            "rpm",
            &["-qa", &format],
            self.config.timeout(),
        )
        .await
    }

    /// Register kept owners of required files that no package lists as a provide
    async fn resolve_files(
        &self,
        index: &mut ProviderIndex,
        capabilities: &HashMap<String, Capabilities>,
    ) {
        let files: BTreeSet<&String> = capabilities
            .values()
            .flat_map(|caps| caps.requires.iter().chain(&caps.recommends))
            .filter(|capability| capability.starts_with('/') && !index.provides(capability))
            .collect();

        for file in files {
            let result = self
                .executor
                .run(
                    "rpm",
                    &["-q", "--whatprovides", "--queryformat=%{NAME}:%{ARCH}\\n", file],
                    self.config.timeout(),
                )
                .await;
            match result {
                Ok(result) if result.success() => {
                    let owners: Vec<&str> =
                        result.lines().filter(|owner| index.is_kept(owner)).collect();
                    for owner in owners {
                        index.add(file, owner);
                    }
                }
                Ok(_) => debug!(file = %file, "no installed package provides file"),
                Err(e) => warn!(file = %file, error = %e, "failed to resolve file dependency"),
            }
        }
    }
}

#[async_trait]
impl Collector for DnfCollector {
    #[instrument(skip(self))]
    async fn collect(&self) -> Result<PackageCollection, PackageError> {
        debug!("collecting DNF packages");

        let reasons = parse_reasons(
            &query(
                self.executor.as_ref(),
                "dnf",
                &["repoquery", "--installed", "--queryformat", REASON_FORMAT],
                self.config.timeout(),
            )
            .await?,
        );
        let packages = parse_packages(&self.rpm_query(PACKAGE_FORMAT).await?)?;
        let capabilities = parse_capabilities(&self.rpm_query(CAPABILITY_FORMAT).await?);

        let kept: Vec<&RpmPackage> = packages
            .iter()
            .filter(|package| kept_reason(package, &reasons).is_some())
            .collect();
        let mut index = ProviderIndex::new(&kept, &capabilities);
        self.resolve_files(&mut index, &capabilities).await;

        Ok(assemble(&packages, &reasons, &capabilities, &index))
    }

    /// Promote disconnected bottom packages that no other disconnected package depends on
    fn post_process(&self, collection: &mut PackageCollection) {
        let disconnected = collection.disconnected_from_top();
        let promoted: BTreeSet<&String> = disconnected
            .iter()
            .filter(|id| {
                collection.get(id).is_some_and(|details| {
                    !details
                        .recursive_what_requires
                        .union(&details.recursive_what_complements)
                        .any(|x| disconnected.contains(x))
                })
            })
            .collect();

        for id in &promoted {
            if let Err(e) = collection.move_up(id) {
                warn!(package = %id, error = %e, "failed to promote package");
            }
        }

        if !promoted.is_empty() {
            let list: Vec<String> = promoted.iter().map(|id| format!("  • {id}")).collect();
            debug!(
                "Presumed to be explicitly user-installed (possibly via GNOME Software \
                 or PackageKit-command-not-found) albeit not marked as such:\n{}",
                list.join("\n")
            );
        }
    }

    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Dnf
    }

    fn is_available(&self) -> bool {
        which::which("dnf").is_ok() && which::which("rpm").is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as Map;
    use std::sync::Mutex;
    use std::time::Duration;

    use dabs_exec::{CommandResult, ExecError};

    use super::*;

    /// Mock executor answering by program and first argument
    struct MockExecutor {
        responses: Map<String, CommandResult>,
        calls: Mutex<Vec<String>>,
    }

    impl MockExecutor {
        fn new() -> Self {
            Self {
                responses: Map::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_response(mut self, key: &str, stdout: &str) -> Self {
            self.responses
                .insert(key.to_string(), CommandResult::ok(stdout));
            self
        }
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn run(
            &self,
            program: &str,
            args: &[&str],
            _timeout: Duration,
        ) -> Result<CommandResult, ExecError> {
            let key = match args {
                [_, format, ..] if format.contains("PROVIDENAME") => {
                    format!("{program} capabilities")
                }
                [flag, ..] => format!("{program} {flag}"),
                [] => program.to_string(),
            };
            self.calls.lock().unwrap().push(args.join(" "));
            self.responses
                .get(&key)
                .cloned()
                .ok_or_else(|| ExecError::NotFound(program.to_string()))
        }
    }

    const REASONS: &str = "\
gimp\tx86_64\tuser
gimp-libs\tx86_64\tdependency
babl\tx86_64\tdependency
gimp-help\tnoarch\tweak-dependency
gnome-shell\tx86_64\tgroup
kernel-core\tx86_64\tuser
";

    const PACKAGES: &str = "\
gimp\tx86_64\t2.10.36-1.fc39\t90000\tUnspecified\tGNU Image Manipulation Program
gimp-libs\tx86_64\t2.10.36-1.fc39\t10000\tUnspecified\tGIMP libraries
babl\tx86_64\t0.1.106-1.fc39\t2000\tSystem Environment/Libraries\tDynamic pixel format translation
gimp-help\tnoarch\t2.10.34-1.fc39\t50000\tUnspecified\tHelp files for GIMP
gnome-shell\tx86_64\t45.1-1.fc39\t12000\tUnspecified\tWindow management
kernel-core\tx86_64\t6.5.6-300.fc39\t70000\tUnspecified\tThe Linux kernel
gpg-pubkey\t(none)\t18b8e74c-62f2920f\t0\tPublic Keys\tgpg(Fedora (39))
";

    const CAPABILITIES: &str = "\
gimp\tx86_64\tprovides\tgimp(x86-64)
gimp\tx86_64\trequires\tlibgimp-2.0.so.0()(64bit)
gimp\tx86_64\trequires\t/usr/bin/python3
gimp\tx86_64\trequires\trpmlib(CompressedFileNames)
gimp\tx86_64\trecommends\tgimp-help
gimp-libs\tx86_64\tprovides\tlibgimp-2.0.so.0()(64bit)
gimp-libs\tx86_64\trequires\tlibbabl-0.1.so.0()(64bit)
gimp-libs\tx86_64\trequires\tgimp-libs
babl\tx86_64\tprovides\tlibbabl-0.1.so.0()(64bit)
gimp-help\tnoarch\tsupplements\tgimp
gnome-shell\tx86_64\tprovides\tlibbabl-0.1.so.0()(64bit)
gimp\tx86_64\tsuggests\t(none)
";

    fn parsed() -> (
        Vec<RpmPackage>,
        HashMap<String, String>,
        HashMap<String, Capabilities>,
    ) {
        (
            parse_packages(PACKAGES).unwrap(),
            parse_reasons(REASONS),
            parse_capabilities(CAPABILITIES),
        )
    }

    #[test]
    fn test_parse_packages() {
        let packages = parse_packages(PACKAGES).unwrap();
        assert_eq!(packages.len(), 7);
        assert_eq!(packages[6].identifier(), "gpg-pubkey:(none)");
        assert_eq!(packages[0].identifier(), "gimp:x86_64");
        assert_eq!(packages[0].version, "2.10.36-1.fc39");
        assert_eq!(packages[2].size, 2000);
        assert!(parse_packages("gimp\tx86_64\n").is_err());
    }

    #[test]
    fn test_parse_packages_rejects_bad_size() {
        let err = parse_packages("gimp\tx86_64\t2.10\tbig\tUnspecified\tGIMP\n").unwrap_err();
        assert!(matches!(err, PackageError::ParseError(_)));
        let packages = parse_packages("gimp\tx86_64\t2.10\t(none)\tUnspecified\tGIMP\n").unwrap();
        assert_eq!(packages[0].size, 0);
    }

    #[test]
    fn test_parse_capabilities_skips_none() {
        let capabilities = parse_capabilities(CAPABILITIES);
        let gimp = &capabilities["gimp:x86_64"];
        assert_eq!(gimp.requires.len(), 3);
        assert!(gimp.suggests.is_empty());
        assert_eq!(gimp.recommends, vec!["gimp-help"]);
    }

    #[test]
    fn test_assemble_levels_and_exclusions() {
        let (packages, reasons, capabilities) = parsed();
        let kept: Vec<&RpmPackage> = packages
            .iter()
            .filter(|p| kept_reason(p, &reasons).is_some())
            .collect();
        let index = ProviderIndex::new(&kept, &capabilities);

        let collection = assemble(&packages, &reasons, &capabilities, &index);

        assert_eq!(collection.level_of("gimp:x86_64"), Some(Level::Top));
        assert_eq!(collection.level_of("babl:x86_64"), Some(Level::Bottom));
        assert!(!collection.contains("gnome-shell:x86_64"));
        assert!(!collection.contains("kernel-core:x86_64"));
        assert!(!collection.contains("gpg-pubkey:(none)"));

        let gimp = collection.get("gimp:x86_64").unwrap();
        assert_eq!(gimp.requires, vec!["gimp-libs:x86_64"]);
        assert_eq!(gimp.advises, vec!["gimp-help:noarch"]);
        assert_eq!(gimp.category, None);
        assert!(!gimp.auto_installed);

        // Excluded providers and self-requirements are dropped
        let libs = collection.get("gimp-libs:x86_64").unwrap();
        assert_eq!(libs.requires, vec!["babl:x86_64"]);

        let babl = collection.get("babl:x86_64").unwrap();
        assert_eq!(babl.category.as_deref(), Some("System Environment/Libraries"));

        let help = collection.get("gimp-help:noarch").unwrap();
        assert_eq!(help.supplements.as_deref(), Some(&["gimp:x86_64".to_string()][..]));
    }

    #[tokio::test]
    async fn test_collect_resolves_file_requires() {
        let executor = MockExecutor::new()
            .with_response("dnf repoquery", REASONS)
            .with_response("rpm -qa", PACKAGES)
            .with_response("rpm capabilities", CAPABILITIES)
            .with_response("rpm -q", "babl:x86_64\n");
        let executor = Arc::new(executor);
        let collector = DnfCollector::new(executor.clone(), CollectorConfig::default());

        let collection = collector.collect().await.unwrap();

        let gimp = collection.get("gimp:x86_64").unwrap();
        assert_eq!(gimp.requires, vec!["babl:x86_64", "gimp-libs:x86_64"]);
        let calls = executor.calls.lock().unwrap();
        assert!(calls.iter().any(|c| c.ends_with("/usr/bin/python3")));
    }

    #[tokio::test]
    async fn test_collect_skips_excluded_file_owners() {
        let executor = MockExecutor::new()
            .with_response("dnf repoquery", REASONS)
            .with_response("rpm -qa", PACKAGES)
            .with_response("rpm capabilities", CAPABILITIES)
            .with_response("rpm -q", "kernel-core:x86_64\ngnome-shell:x86_64\n");
        let collector = DnfCollector::new(Arc::new(executor), CollectorConfig::default());

        let collection = collector.collect().await.unwrap();

        let gimp = collection.get("gimp:x86_64").unwrap();
        assert_eq!(gimp.requires, vec!["gimp-libs:x86_64"]);
        assert!(collection.edges().iter().all(|edge| !edge.to.starts_with("kernel")));
    }

    #[tokio::test]
    async fn test_signing_keys_stay_out_of_the_collection() {
        let executor = MockExecutor::new()
            .with_response("dnf repoquery", REASONS)
            .with_response("rpm -qa", PACKAGES)
            .with_response("rpm capabilities", CAPABILITIES)
            .with_response("rpm -q", "");
        let collector = DnfCollector::new(Arc::new(executor), CollectorConfig::default());

        let mut collection = collector.collect().await.unwrap();
        collection.compute_recursive_dependencies();
        collector.post_process(&mut collection);

        assert_eq!(collection.level_of("gpg-pubkey:(none)"), None);
        assert_eq!(collection.level_of("gimp:x86_64"), Some(Level::Top));
    }

    #[tokio::test]
    async fn test_collect_propagates_command_failure() {
        let executor = MockExecutor::new().with_response("dnf repoquery", REASONS);
        let collector = DnfCollector::new(Arc::new(executor), CollectorConfig::default());

        let result = collector.collect().await;
        assert!(result.unwrap_err().is_manager_not_found());
    }

    #[test]
    fn test_post_process_promotes_disconnected_roots() {
        let collector = DnfCollector::new(
            Arc::new(MockExecutor::new()),
            CollectorConfig::default(),
        );
        let mut collection = PackageCollection::new();
        collection.add(
            Level::Top,
            "app:x86_64",
            PackageDetails::new("app").with_requires(["lib:x86_64"]),
        );
        collection.add(Level::Bottom, "lib:x86_64", PackageDetails::new("lib"));
        collection.add(
            Level::Bottom,
            "cnf:noarch",
            PackageDetails::new("cnf").with_requires(["cnf-lib:x86_64"]),
        );
        collection.add(Level::Bottom, "cnf-lib:x86_64", PackageDetails::new("cnf-lib"));
        collection.compute_recursive_dependencies();

        collector.post_process(&mut collection);

        assert_eq!(collection.level_of("cnf:noarch"), Some(Level::Top));
        assert_eq!(collection.level_of("cnf-lib:x86_64"), Some(Level::Bottom));
        assert_eq!(collection.level_of("lib:x86_64"), Some(Level::Bottom));
    }
}
