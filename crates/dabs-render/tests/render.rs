//! Renderer output on a small fixed collection

use dabs_core::{Level, PackageCollection, PackageDetails};
use dabs_render::{Legend, OutputConfig, bar_chart, details, find_candidate, render_dot};

fn fixture() -> PackageCollection {
    let mut collection = PackageCollection::new();
    collection.add(
        Level::Top,
        "browser",
        PackageDetails::new("browser")
            .with_installed_bytes(400_000)
            .with_requires(["libgtk", "libssl"])
            .with_advises(["fonts"]),
    );
    collection.add(
        Level::Top,
        "mail",
        PackageDetails::new("mail")
            .with_installed_bytes(100_000)
            .with_requires(["libgtk"])
            .with_advises(["fonts"]),
    );
    collection.add(
        Level::Top,
        "office",
        PackageDetails::new("office")
            .with_installed_bytes(900_000)
            .with_requires(["mail"]),
    );
    collection.add(
        Level::Bottom,
        "libgtk",
        PackageDetails::new("libgtk")
            .with_installed_bytes(300_000)
            .with_requires(["libglib"]),
    );
    collection.add(
        Level::Bottom,
        "libglib",
        PackageDetails::new("libglib").with_installed_bytes(60_000),
    );
    collection.add(
        Level::Bottom,
        "libssl",
        PackageDetails::new("libssl").with_installed_bytes(40_000),
    );
    collection.add(
        Level::Bottom,
        "fonts",
        PackageDetails::new("fonts").with_installed_bytes(20_000),
    );
    collection.compute_recursive_dependencies();
    collection.compute_pseudobytes();
    collection
}

fn plain(line: &ratatui::text::Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

#[test]
fn test_dot_is_well_formed() {
    let dot = render_dot(&fixture(), &OutputConfig::default()).unwrap();

    assert!(dot.starts_with("digraph D {\n"));
    assert!(dot.ends_with("\n}\n"));
    assert_eq!(dot.matches('{').count(), 1);
    for line in dot.lines().filter(|l| l.starts_with("  \"")) {
        assert!(line.ends_with(']'), "{line}");
        assert_eq!(line.matches('[').count(), 1, "{line}");
        assert_eq!(line.matches('"').count() % 2, 0, "{line}");
    }
}

#[test]
fn test_dot_groups_shared_requirements() {
    let dot = render_dot(&fixture(), &OutputConfig::default()).unwrap();

    assert!(dot.contains("  \"#0\" [shape=\"point\""));
    assert!(dot.contains("tooltip=\"libglib\\nlibgtk\""));
    for sharer in ["browser", "mail", "office"] {
        assert!(dot.contains(&format!("  \"{sharer}\" -> \"#0\" [arrowhead=\"none\"")));
    }
    // libssl belongs to a single top-level package
    assert!(!dot.contains("libssl"));
}

#[test]
fn test_dot_top_level_edges_and_advice_groups() {
    let dot = render_dot(&fixture(), &OutputConfig::default()).unwrap();

    assert!(dot.contains("  \"office\" -> \"mail\" [penwidth=\"4.0\",color=\"#"));
    assert!(dot.contains("  \"#R0\" [label=\"fonts\\l\""));
    assert!(dot.contains("  \"browser\" -> \"#R0\" [style=\"dashed\""));
    assert!(dot.contains("  \"mail\" -> \"#R0\" [style=\"dashed\""));
    assert!(dot.contains("  \"office\" [label=\"office\",shape=\"circle\""));
}

#[test]
fn test_dot_is_deterministic() {
    let collection = fixture();
    let config = OutputConfig::default();
    assert_eq!(
        render_dot(&collection, &config).unwrap(),
        render_dot(&collection, &config).unwrap()
    );
}

#[test]
fn test_dot_of_empty_collection() {
    let dot = render_dot(&PackageCollection::new(), &OutputConfig::default()).unwrap();
    assert!(dot.starts_with("digraph D {\n"));
    assert!(!dot.contains("->"));
}

#[test]
fn test_bar_chart_rows() {
    let chart = bar_chart(&fixture(), Legend::Native, &OutputConfig::default());

    let ids: Vec<&str> = chart.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids[0], "office");
    assert_eq!(ids.len(), 3);
    for row in &chart.rows {
        let text = plain(&row.line);
        let bar: String = text
            .chars()
            .skip_while(|c| *c != '[')
            .skip(1)
            .take_while(|c| *c != ']')
            .collect();
        assert_eq!(bar.chars().count(), 15, "{text}");
    }
}

#[test]
fn test_details_lists_closure() {
    let collection = fixture();
    let lines = details(&collection, "office", &OutputConfig::default()).unwrap();
    let text: Vec<String> = lines.iter().map(plain).collect();

    for name in ["office", "mail", "libgtk", "fonts", "libglib"] {
        assert!(text.iter().any(|l| l.contains(name)), "{name} missing");
    }
    assert!(!text.iter().any(|l| l.contains("libssl")));
}

#[test]
fn test_find_candidate() {
    let collection = fixture();
    assert_eq!(find_candidate(&collection, "off").unwrap(), "office");
    assert!(find_candidate(&collection, "lib").is_err());
}
