use std::collections::{BTreeSet, HashMap};

use flatfs::path::{components, is_within, join};

/// The kernel always addresses the mount root as inode 1.
pub const ROOT_INO: u64 = 1;

/// Remembers the paths the kernel has seen for each inode number.
///
/// The kernel addresses files by inode number while the file system resolves paths, so every
/// name handed out through lookup, create or link is recorded here. An inode reachable through
/// several hard links keeps all of its known paths; any of them resolves to the same file.
pub struct PathTable {
    paths: HashMap<u64, BTreeSet<String>>,
}

impl PathTable {
    pub fn new() -> Self {
        let mut paths = HashMap::new();
        paths.insert(ROOT_INO, std::iter::once("/".to_string()).collect());
        Self { paths }
    }

    pub fn get(&self, ino: u64) -> Option<&str> {
        self.paths
            .get(&ino)
            .and_then(|known| known.iter().next())
            .map(String::as_str)
    }

    pub fn insert(&mut self, ino: u64, path: String) {
        self.paths.entry(ino).or_default().insert(path);
    }

    /// Forgets `path` and everything beneath it.
    pub fn remove(&mut self, path: &str) {
        for known in self.paths.values_mut() {
            known.retain(|p| !is_within(p, path));
        }
        self.paths
            .retain(|&ino, known| ino == ROOT_INO || !known.is_empty());
    }

    /// Moves `from` and everything beneath it to `to`, dropping whatever `to` named before.
    pub fn rename(&mut self, from: &str, to: &str) {
        self.remove(to);
        for known in self.paths.values_mut() {
            *known = known
                .iter()
                .map(|p| rebase(p, from, to).unwrap_or_else(|| p.clone()))
                .collect();
        }
    }
}

/// `path` with its `from` prefix replaced by `to`, if it lies under `from`.
fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    let rest: Vec<&str> = components(path).skip(components(from).count()).collect();
    if rest.is_empty() {
        Some(to.to_string())
    } else {
        Some(join(to, &rest.join("/")))
    }
}
