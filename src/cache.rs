//! On-disk cache of compiled program output.
//!
//! One JSON entry per source file under `.pulse/cache`, stamped with a
//! SHA-256 digest of the source text. A digest mismatch or an unreadable
//! entry is a miss; corrupt entries are deleted on sight.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::compile::ProgramOutput;

const CACHE_DIR: &str = ".pulse/cache";

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    hash: String,
    output: ProgramOutput,
}

pub struct CompileCache {
    root: PathBuf,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::at(PathBuf::from(CACHE_DIR))
    }

    fn at(root: PathBuf) -> Self {
        if !root.exists() {
            fs::create_dir_all(&root).ok();
        }
        CompileCache { root }
    }

    pub fn fingerprint(source: &str) -> String {
        format!("{:x}", Sha256::digest(source.as_bytes()))
    }

    /// One flat file per source path; separators mangle to underscores.
    fn entry_path(&self, file_path: &str) -> PathBuf {
        let name: String = file_path
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.root.join(format!("{}.json", name))
    }

    pub fn get(&self, file_path: &str, source: &str) -> Option<ProgramOutput> {
        let path = self.entry_path(file_path);
        let data = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(entry) => entry,
            Err(_) => {
                fs::remove_file(&path).ok();
                return None;
            }
        };
        (entry.hash == Self::fingerprint(source)).then_some(entry.output)
    }

    pub fn set(&self, file_path: &str, source: &str, output: ProgramOutput) {
        let entry = CacheEntry {
            hash: Self::fingerprint(source),
            output,
        };
        if let Ok(data) = serde_json::to_string(&entry) {
            fs::write(self.entry_path(file_path), data).ok();
        }
    }
}

impl Default for CompileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_cache(tag: &str) -> CompileCache {
        let root = std::env::temp_dir().join(format!(
            "pulse-cache-test-{}-{}",
            tag,
            std::process::id()
        ));
        fs::remove_dir_all(&root).ok();
        CompileCache::at(root)
    }

    fn empty_output() -> ProgramOutput {
        ProgramOutput {
            components: Vec::new(),
            errors: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_round_trip_hits_on_same_source() {
        let cache = scratch_cache("hit");
        cache.set("pages/app.jsx", "let a = 1;", empty_output());
        assert!(cache.get("pages/app.jsx", "let a = 1;").is_some());
    }

    #[test]
    fn test_changed_source_misses() {
        let cache = scratch_cache("miss");
        cache.set("pages/app.jsx", "let a = 1;", empty_output());
        assert!(cache.get("pages/app.jsx", "let a = 2;").is_none());
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let cache = scratch_cache("corrupt");
        let path = cache.entry_path("broken.jsx");
        fs::write(&path, "not json").unwrap();
        assert!(cache.get("broken.jsx", "let a = 1;").is_none());
        assert!(!path.exists());
    }
}
