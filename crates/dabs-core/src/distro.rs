//! Operating system identification from os-release

use std::fs;
use std::path::Path;

const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// Return `ID` followed by the `ID_LIKE` ids, ordered by precedence
///
/// `None` when no os-release file can be read or it carries no `ID`.
#[must_use]
pub fn like_distro_ids() -> Option<Vec<String>> {
    OS_RELEASE_PATHS
        .iter()
        .map(Path::new)
        .find(|path| path.is_file())
        .and_then(|path| fs::read_to_string(path).ok())
        .and_then(|content| parse_os_release(&content))
}

/// Parse os-release content into the id list
#[must_use]
pub fn parse_os_release(content: &str) -> Option<Vec<String>> {
    let mut id = None;
    let mut id_like = Vec::new();

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("ID=") {
            id = Some(unquote(value).to_string());
        } else if let Some(value) = line.strip_prefix("ID_LIKE=") {
            id_like = unquote(value)
                .split_whitespace()
                .map(str::to_string)
                .collect();
        }
    }

    let mut ids = vec![id.filter(|id| !id.is_empty())?];
    ids.extend(id_like);
    Some(ids)
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}
