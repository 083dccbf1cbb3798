//! Collection pipeline tests with an in-memory collector

use async_trait::async_trait;
use dabs_core::{Level, PackageCollection, PackageDetails};
use dabs_pkg::{Collector, PackageError, PackageManagerType, build_collection};

struct FixtureCollector {
    available: bool,
    prune: bool,
}

#[async_trait]
impl Collector for FixtureCollector {
    async fn collect(&self) -> Result<PackageCollection, PackageError> {
        let mut collection = PackageCollection::new();
        collection.add(
            Level::Top,
            "browser",
            PackageDetails::new("browser")
                .with_installed_bytes(400)
                .with_requires(["libgtk", "libssl"])
                .with_advises(["fonts"]),
        );
        collection.add(
            Level::Top,
            "mail",
            PackageDetails::new("mail")
                .with_installed_bytes(100)
                .with_requires(["libgtk"]),
        );
        collection.add(
            Level::Bottom,
            "libgtk",
            PackageDetails::new("libgtk")
                .with_installed_bytes(300)
                .with_requires(["libglib"]),
        );
        collection.add(
            Level::Bottom,
            "libglib",
            PackageDetails::new("libglib").with_installed_bytes(60),
        );
        collection.add(
            Level::Bottom,
            "libssl",
            PackageDetails::new("libssl").with_installed_bytes(40),
        );
        collection.add(
            Level::Bottom,
            "fonts",
            PackageDetails::new("fonts").with_installed_bytes(20),
        );
        collection.add(
            Level::Bottom,
            "leftover",
            PackageDetails::new("leftover").with_installed_bytes(999),
        );
        Ok(collection)
    }

    fn post_process(&self, collection: &mut PackageCollection) {
        if self.prune {
            for id in collection.disconnected_from_top() {
                collection.remove(&id);
            }
        }
    }

    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Apt
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

#[tokio::test]
async fn test_pipeline_conserves_connected_bytes() {
    let collector = FixtureCollector {
        available: true,
        prune: true,
    };

    let collection = build_collection(&collector).await.unwrap();

    assert!(!collection.contains("leftover"));
    let top_bytes: f64 = collection.top().values().map(PackageDetails::all_bytes).sum();
    assert!((top_bytes - 920.0).abs() < 1e-9);

    let browser = collection.get("browser").unwrap();
    // Half of libgtk and libglib, all of libssl
    assert!((browser.r_requires_pseudobytes - 220.0).abs() < 1e-9);
    assert!((browser.r_complements_pseudobytes - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_pipeline_keeps_levels_disjoint() {
    let collector = FixtureCollector {
        available: true,
        prune: false,
    };

    let collection = build_collection(&collector).await.unwrap();

    assert!(collection.top().keys().all(|id| !collection.bottom().contains_key(id)));
    assert_eq!(collection.get("leftover").unwrap().count, Some(0));
    assert_eq!(collection.get("libgtk").unwrap().count, Some(2));
}

#[tokio::test]
async fn test_unavailable_manager_is_reported() {
    let collector = FixtureCollector {
        available: false,
        prune: false,
    };

    let error = build_collection(&collector).await.unwrap_err();
    assert!(error.is_manager_not_found());
    assert!(error.to_string().contains("apt"));
}
