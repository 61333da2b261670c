use std::collections::BTreeSet;

use serde::Serialize;

/// Base tooling needed to build every component.
pub const BASE_BUILD_TOOLS: &[&str] = &[
    "build-essential",
    "git",
    "pkg-config",
    "python3",
    "python3-venv",
    "ninja-build",
    "flex",
    "bison",
    "bc",
    "libelf-dev",
    "libssl-dev",
    "xz-utils",
];

/// Libraries QEMU needs regardless of profile.
pub const PROFILE_INVARIANT_LIBS: &[&str] = &[
    "libglib2.0-dev",
    "libpixman-1-dev",
    "zlib1g-dev",
];

pub const MUSL_PACKAGES: &[&str] = &["musl-tools", "musl-dev"];

/// Insertion-ordered package list; the first occurrence keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageSet {
    names: Vec<String>,
    #[serde(skip)]
    seen: BTreeSet<String>,
}

impl PackageSet {
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || !self.seen.insert(name.to_string()) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn extend<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for n in names {
            self.insert(n);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::PackageSet;

    #[test]
    fn keeps_first_position_on_duplicates() {
        let mut set = PackageSet::default();
        set.extend(["a", "b", "a", " c ", ""]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(set.contains("c"));
    }
}
