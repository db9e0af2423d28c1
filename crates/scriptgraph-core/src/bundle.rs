//! Bundle-level metadata: platform policy and seed lists

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct BundleMeta {
    #[serde(default)]
    platform: String,
}

/// True iff the bundle root carries a `meta.json` declaring
/// `platform = "windows"`. Any read or parse failure means non-Windows.
pub fn is_windows_bundle(root: &Path) -> bool {
    let Ok(text) = fs::read_to_string(root.join("meta.json")) else {
        return false;
    };
    match serde_json::from_str::<BundleMeta>(&text) {
        Ok(meta) => meta.platform.to_lowercase() == "windows",
        Err(_) => false,
    }
}

/// Load the seed set from `seeds.txt` or `.seeds` at the bundle root.
///
/// One path per line, `#` comments skipped, leading `./` stripped,
/// backslashes normalized.
pub fn load_seeds(root: &Path) -> BTreeSet<String> {
    let mut seeds = BTreeSet::new();
    for name in ["seeds.txt", ".seeds"] {
        let Ok(text) = fs::read_to_string(root.join(name)) else {
            continue;
        };
        for line in text.lines() {
            let s = line.trim();
            if s.is_empty() || s.starts_with('#') {
                continue;
            }
            let s = s.replace('\\', "/");
            let s = s.trim_start_matches("./");
            seeds.insert(s.to_string());
        }
    }
    seeds
}
