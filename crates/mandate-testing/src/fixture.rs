//! JSON fixture loader.
//!
//! Fixtures live under `fixtures/` at the workspace root. Lookup walks up
//! from the calling crate's manifest dir, so tests in any member crate can
//! use workspace-relative paths.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Load a JSON fixture file relative to the workspace root.
///
/// # Example
/// ```no_run
/// use mandate_testing::fixture::Fixture;
/// let val = Fixture::load("fixtures/sequences/secuencia_precio.json");
/// ```
pub struct Fixture;

impl Fixture {
    /// Load and parse a fixture JSON file at `workspace_root/path`.
    ///
    /// Panics if the file is missing or invalid JSON.
    pub fn load(relative_path: &str) -> Value {
        let full_path = resolve(relative_path);
        let contents = std::fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("fixture not found at {}: {}", full_path.display(), e));
        serde_json::from_str(&contents)
            .unwrap_or_else(|e| panic!("invalid JSON in fixture {}: {}", relative_path, e))
    }

    /// Load a fixture and deserialize it into `T`.
    ///
    /// Panics if the fixture does not match `T`'s shape.
    pub fn load_as<T: DeserializeOwned>(relative_path: &str) -> T {
        serde_json::from_value(Self::load(relative_path)).unwrap_or_else(|e| {
            panic!(
                "fixture {} does not match {}: {}",
                relative_path,
                std::any::type_name::<T>(),
                e
            )
        })
    }
}

fn resolve(relative_path: &str) -> PathBuf {
    let start = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    start
        .ancestors()
        .map(|dir| dir.join(relative_path))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| Path::new(&start).join(relative_path))
}
