//! QEMU feature directives and the builtin profile tables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::target::BuildProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureState {
    Enabled,
    Disabled,
}

impl FeatureState {
    pub fn from_bool(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureDirective {
    pub name: String,
    pub state: FeatureState,
}

impl FeatureDirective {
    pub fn enable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: FeatureState::Enabled,
        }
    }

    pub fn disable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: FeatureState::Disabled,
        }
    }

    /// `--enable-<name>` or `--disable-<name>`.
    pub fn to_flag(&self) -> String {
        match self.state {
            FeatureState::Enabled => format!("--enable-{}", self.name),
            FeatureState::Disabled => format!("--disable-{}", self.name),
        }
    }
}

use FeatureState::{Disabled as D, Enabled as E};

const MINIMAL: &[(&str, FeatureState)] = &[
    ("kvm", E),
    ("slirp", E),
    ("virtfs", E),
    ("attr", E),
    ("cap-ng", E),
    ("vhost-net", E),
    ("gtk", D),
    ("sdl", D),
    ("opengl", D),
    ("docs", D),
    ("guest-agent", D),
];

const DEFAULT: &[(&str, FeatureState)] = &[
    ("kvm", E),
    ("slirp", E),
    ("virtfs", E),
    ("attr", E),
    ("cap-ng", E),
    ("vhost-net", E),
    ("seccomp", E),
    ("linux-aio", E),
    ("tpm", E),
    ("vhost-user", E),
    ("docs", D),
];

const FULL: &[(&str, FeatureState)] = &[
    ("kvm", E),
    ("slirp", E),
    ("virtfs", E),
    ("attr", E),
    ("cap-ng", E),
    ("vhost-net", E),
    ("seccomp", E),
    ("linux-aio", E),
    ("tpm", E),
    ("vhost-user", E),
    ("gtk", E),
    ("sdl", E),
    ("opengl", E),
    ("virglrenderer", E),
    ("spice", E),
    ("vnc", E),
    ("curses", E),
    ("libusb", E),
    ("usb-redir", E),
    ("guest-agent", E),
    ("linux-io-uring", E),
    ("docs", D),
];

/// Host packages implied by enabling a feature.
const FEATURE_PACKAGES: &[(&str, &[&str])] = &[
    ("slirp", &["libslirp-dev"]),
    ("attr", &["libattr1-dev"]),
    ("cap-ng", &["libcap-ng-dev"]),
    ("virtfs", &["libattr1-dev", "libcap-ng-dev"]),
    ("seccomp", &["libseccomp-dev"]),
    ("linux-aio", &["libaio-dev"]),
    ("linux-io-uring", &["liburing-dev"]),
    ("gtk", &["libgtk-3-dev"]),
    ("sdl", &["libsdl2-dev"]),
    ("opengl", &["libepoxy-dev", "libgbm-dev"]),
    ("virglrenderer", &["libvirglrenderer-dev"]),
    ("spice", &["libspice-server-dev", "libspice-protocol-dev"]),
    ("vnc", &["libjpeg-dev", "libpng-dev"]),
    ("curses", &["libncurses-dev"]),
    ("libusb", &["libusb-1.0-0-dev"]),
    ("usb-redir", &["libusbredirparser-dev"]),
];

pub fn profile_table(profile: BuildProfile) -> &'static [(&'static str, FeatureState)] {
    match profile {
        BuildProfile::Minimal => MINIMAL,
        BuildProfile::Default => DEFAULT,
        BuildProfile::Full => FULL,
    }
}

pub fn profile_directives(profile: BuildProfile) -> Vec<FeatureDirective> {
    profile_table(profile)
        .iter()
        .map(|&(name, state)| FeatureDirective {
            name: name.to_string(),
            state,
        })
        .collect()
}

pub fn feature_packages(name: &str) -> &'static [&'static str] {
    FEATURE_PACKAGES
        .iter()
        .find(|(feature, _)| *feature == name)
        .map(|(_, pkgs)| *pkgs)
        .unwrap_or(&[])
}

/// Collapses repeated names: the last state wins, the first position is kept.
pub fn normalize(directives: &[FeatureDirective]) -> Vec<FeatureDirective> {
    let mut out: Vec<FeatureDirective> = Vec::with_capacity(directives.len());
    for d in directives {
        match out.iter_mut().find(|existing| existing.name == d.name) {
            Some(existing) => existing.state = d.state,
            None => out.push(d.clone()),
        }
    }
    out
}

/// Appends `overrides` after `base` and normalizes.
pub fn apply_overrides(
    base: &[FeatureDirective],
    overrides: &[FeatureDirective],
) -> Vec<FeatureDirective> {
    let mut all = base.to_vec();
    all.extend(overrides.iter().cloned());
    normalize(&all)
}

/// Overrides that change the state of a builtin directive, paired with the
/// builtin they replace.
pub fn flipped<'a>(
    builtin: &'a [FeatureDirective],
    overrides: &'a [FeatureDirective],
) -> Vec<(&'a FeatureDirective, &'a FeatureDirective)> {
    overrides
        .iter()
        .filter_map(|o| {
            builtin
                .iter()
                .find(|b| b.name == o.name && b.state != o.state)
                .map(|b| (b, o))
        })
        .collect()
}

pub fn effective_states(directives: &[FeatureDirective]) -> BTreeMap<&str, FeatureState> {
    let mut out = BTreeMap::new();
    for d in directives {
        out.insert(d.name.as_str(), d.state);
    }
    out
}

pub fn enabled_names(directives: &[FeatureDirective]) -> Vec<&str> {
    effective_states(directives)
        .into_iter()
        .filter_map(|(name, state)| state.is_enabled().then_some(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn builtin_tables_do_not_repeat_names() {
        for profile in BuildProfile::ALL {
            let mut seen = BTreeSet::new();
            for (name, _) in profile_table(profile) {
                assert!(seen.insert(*name), "{profile}: '{name}' listed twice");
            }
        }
    }

    #[test]
    fn enabled_sets_are_nested() {
        let sets: Vec<BTreeSet<String>> = BuildProfile::ALL
            .iter()
            .map(|p| {
                enabled_names(&profile_directives(*p))
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect();
        for pair in sets.windows(2) {
            let missing: Vec<_> = pair[0].difference(&pair[1]).collect();
            assert!(missing.is_empty(), "missing from larger profile: {missing:?}");
        }
    }

    #[test]
    fn normalize_keeps_first_position_and_last_state() {
        let got = normalize(&[
            FeatureDirective::enable("a"),
            FeatureDirective::disable("b"),
            FeatureDirective::disable("a"),
        ]);
        assert_eq!(
            got,
            vec![FeatureDirective::disable("a"), FeatureDirective::disable("b")]
        );
    }

    #[test]
    fn overrides_append_unknown_names() {
        let got = apply_overrides(
            &[FeatureDirective::enable("kvm")],
            &[FeatureDirective::enable("vnc")],
        );
        assert_eq!(got.last().map(|d| d.to_flag()).as_deref(), Some("--enable-vnc"));
    }

    #[test]
    fn default_directives_are_all_kept_by_full() {
        let full = profile_directives(BuildProfile::Full);
        for d in profile_directives(BuildProfile::Default) {
            assert!(full.contains(&d), "full lacks {}", d.to_flag());
        }
    }

    #[test]
    fn flipped_reports_only_state_changes_to_builtins() {
        let builtin = profile_directives(BuildProfile::Minimal);
        let overrides = [
            FeatureDirective::enable("gtk"),
            FeatureDirective::enable("slirp"),
            FeatureDirective::enable("vnc"),
            FeatureDirective::disable("kvm"),
        ];
        let got: Vec<(String, String)> = flipped(&builtin, &overrides)
            .into_iter()
            .map(|(b, o)| (b.to_flag(), o.to_flag()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("--disable-gtk".to_string(), "--enable-gtk".to_string()),
                ("--enable-kvm".to_string(), "--disable-kvm".to_string()),
            ]
        );
    }

    #[test]
    fn every_feature_package_entry_names_a_known_feature() {
        let known: BTreeSet<&str> = FULL.iter().map(|(n, _)| *n).collect();
        for (feature, pkgs) in FEATURE_PACKAGES {
            assert!(known.contains(feature), "unknown feature '{feature}'");
            assert!(!pkgs.is_empty());
        }
    }
}
