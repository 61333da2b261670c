use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use toml::Value;

use crate::error::{Error, Result};
use crate::features::{FeatureDirective, FeatureState};
use crate::resolver::BuildRequest;
use crate::target::{Architecture, BuildProfile, LibcVariant};

/// A build file after `extends` and `imports` have been inlined.
#[derive(Debug, Clone)]
pub struct BuildFile {
    pub path: PathBuf,
    pub value: Value,
}

impl BuildFile {
    pub fn empty() -> Self {
        Self {
            path: PathBuf::from("<defaults>"),
            value: Value::Table(Default::default()),
        }
    }

    fn document(&self) -> Result<BuildDoc> {
        self.value
            .clone()
            .try_into()
            .map_err(|e| Error::msg(format!("invalid build file {}: {e}", self.path.display())))
    }
}

/// The whole merged document; unknown tables and keys fail deserialization.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct BuildDoc {
    build: BuildTable,
    qemu: QemuTable,
    packages: PackagesTable,
    sources: SourcesTable,
    output: OutputTable,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildTable {
    pub arch: Option<String>,
    pub profile: Option<String>,
    pub libc: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct QemuTable {
    pub features: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PackagesTable {
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesTable {
    pub kernel: String,
    pub qemu: String,
    pub e2fsprogs: String,
}

impl Default for SourcesTable {
    fn default() -> Self {
        Self {
            kernel: "6.6.30".into(),
            qemu: "9.0.0".into(),
            e2fsprogs: "1.47.1".into(),
        }
    }
}

fn default_out_dir() -> String {
    "out".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputTable {
    #[serde(default = "default_out_dir")]
    pub dir: String,
    /// 0 = CPU count.
    pub jobs: usize,
}

impl Default for OutputTable {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            jobs: 0,
        }
    }
}

/// CLI values that take precedence over the build file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub arch: Option<String>,
    pub profile: Option<String>,
    pub libc: Option<String>,
}

/// Everything one invocation needs, after layering defaults, file and CLI.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub request: BuildRequest,
    pub sources: SourcesTable,
    pub output: OutputTable,
}

impl BuildSettings {
    pub fn from_file(file: &BuildFile, cli: &Overrides) -> Result<Self> {
        let BuildDoc {
            build,
            qemu,
            packages,
            sources,
            output,
        } = file.document()?;

        let arch = pick(&cli.arch, &build.arch, Architecture::Amd64.as_str());
        let profile = pick(&cli.profile, &build.profile, BuildProfile::Default.as_str());
        let libc = pick(&cli.libc, &build.libc, LibcVariant::Glibc.as_str());
        let mut request = BuildRequest::parse(arch, profile, libc)?;

        for (name, enabled) in &qemu.features {
            check_name("qemu.features", name)?;
            request.feature_overrides.push(FeatureDirective {
                name: name.clone(),
                state: FeatureState::from_bool(*enabled),
            });
        }
        for name in &packages.extra {
            check_name("packages.extra", name)?;
            request.extra_packages.push(name.clone());
        }
        for (key, version) in [
            ("kernel", &sources.kernel),
            ("qemu", &sources.qemu),
            ("e2fsprogs", &sources.e2fsprogs),
        ] {
            check_version(key, version)?;
        }
        if output.dir.trim().is_empty() {
            return Err(Error::msg("output.dir is empty"));
        }

        tracing::debug!(
            file = %file.path.display(),
            arch = %request.arch,
            profile = %request.profile,
            libc = %request.libc,
            overrides = request.feature_overrides.len(),
            "loaded build settings"
        );

        Ok(Self {
            request,
            sources,
            output,
        })
    }
}

fn pick<'a>(cli: &'a Option<String>, file: &'a Option<String>, default: &'a str) -> &'a str {
    cli.as_deref().or(file.as_deref()).unwrap_or(default)
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9._+-]*$").expect("static regex"))
}

fn check_name(field: &str, name: &str) -> Result<()> {
    if name_re().is_match(name) {
        Ok(())
    } else {
        Err(Error::msg(format!("invalid name '{name}' in {field}")))
    }
}

fn check_version(component: &str, version: &str) -> Result<()> {
    let ok = !version.is_empty()
        && version.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if ok {
        Ok(())
    } else {
        Err(Error::msg(format!(
            "invalid sources.{component} version '{version}' (expected dotted numbers)"
        )))
    }
}

fn merge_values(base: &mut Value, child: Value) {
    match (base, child) {
        (Value::Table(base_tbl), Value::Table(child_tbl)) => {
            for (k, v) in child_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge_values(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (base_slot, child_val) => {
            *base_slot = child_val;
        }
    }
}

fn resolve_ref_path(from_file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        p
    } else {
        from_file.parent().unwrap_or_else(|| Path::new(".")).join(p)
    }
}

fn take_imports(path: &Path, table: &mut toml::value::Table) -> Result<Vec<String>> {
    let Some(raw) = table.remove("imports") else {
        return Ok(Vec::new());
    };
    let Some(arr) = raw.as_array() else {
        return Err(Error::msg(format!(
            "imports in {} must be an array of paths",
            path.display()
        )));
    };
    let mut out = Vec::new();
    for v in arr {
        let Some(s) = v.as_str() else {
            return Err(Error::msg(format!(
                "invalid imports entry in {} (expected string)",
                path.display()
            )));
        };
        let s = s.trim();
        if !s.is_empty() {
            out.push(s.to_string());
        }
    }
    Ok(out)
}

// Imports at any table level land underneath that table's own keys.
fn inline_imports(file_path: &Path, value: &mut Value, stack: &mut HashSet<PathBuf>) -> Result<()> {
    let Value::Table(tbl) = value else {
        return Ok(());
    };

    let imports = take_imports(file_path, tbl)?;
    if !imports.is_empty() {
        let mut acc = Value::Table(Default::default());
        for imp in imports {
            let loaded = load_value(&resolve_ref_path(file_path, &imp), stack)?;
            merge_values(&mut acc, loaded);
        }
        merge_values(&mut acc, Value::Table(std::mem::take(tbl)));
        if let Value::Table(merged) = acc {
            *tbl = merged;
        }
    }

    for (_, v) in tbl.iter_mut() {
        inline_imports(file_path, v, stack)?;
    }
    Ok(())
}

fn load_value(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !stack.insert(canonical.clone()) {
        return Err(Error::msg(format!(
            "build file import cycle detected at {}",
            canonical.display()
        )));
    }
    tracing::debug!(path = %path.display(), "reading build file");

    let data = fs::read_to_string(path)
        .map_err(|e| Error::msg(format!("failed to read build file {}: {e}", path.display())))?;
    let mut value: Value = toml::from_str(&data)
        .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;

    let mut out = Value::Table(Default::default());
    if let Some(tbl) = value.as_table_mut() {
        if let Some(ext) = tbl.remove("extends") {
            let Some(ext) = ext.as_str() else {
                return Err(Error::msg(format!(
                    "extends in {} must be a path string",
                    path.display()
                )));
            };
            out = load_value(&resolve_ref_path(path, ext), stack)?;
        }
    }

    inline_imports(path, &mut value, stack)?;
    merge_values(&mut out, value);

    stack.remove(&canonical);
    Ok(out)
}

pub fn load(path: &Path) -> Result<BuildFile> {
    let mut stack = HashSet::<PathBuf>::new();
    let value = load_value(path, &mut stack)?;
    Ok(BuildFile {
        path: path.to_path_buf(),
        value,
    })
}

// Only the root level may carry `extends`; `imports` may appear in any table.
fn layering_key(value: &Value, root: bool) -> Option<&'static str> {
    let tbl = value.as_table()?;
    if root && tbl.contains_key("extends") {
        return Some("extends");
    }
    if tbl.contains_key("imports") {
        return Some("imports");
    }
    tbl.values().find_map(|v| layering_key(v, false))
}

/// Parses a single in-memory document. Layering needs a file to resolve
/// paths against, so `extends` and `imports` are refused here; use [`load`].
pub fn from_str(src: &str) -> Result<BuildFile> {
    let value: Value = toml::from_str(src)?;
    if let Some(key) = layering_key(&value, true) {
        return Err(Error::msg(format!(
            "inline build documents cannot use '{key}'; load them from a file"
        )));
    }
    Ok(BuildFile {
        path: PathBuf::from("<inline>"),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_wins_over_file_and_file_over_defaults() {
        let file = from_str(
            r#"
[build]
arch = "arm64"
profile = "full"
"#,
        )
        .unwrap();
        let cli = Overrides {
            profile: Some("minimal".into()),
            ..Default::default()
        };
        let s = BuildSettings::from_file(&file, &cli).unwrap();
        assert_eq!(s.request.arch, Architecture::Arm64);
        assert_eq!(s.request.profile, BuildProfile::Minimal);
        assert_eq!(s.request.libc, LibcVariant::Glibc);
    }

    #[test]
    fn invalid_profile_in_file_is_typed() {
        let file = from_str("[build]\nprofile = \"huge\"\n").unwrap();
        let err = BuildSettings::from_file(&file, &Overrides::default()).unwrap_err();
        assert_eq!(err, Error::UnsupportedProfile("huge".into()));
    }

    #[test]
    fn rejects_unknown_tables() {
        let file = from_str("[kernel]\nprofile = \"full\"\n").unwrap();
        let err = BuildSettings::from_file(&file, &Overrides::default())
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid build file <inline>"), "unexpected err: {err}");
        assert!(err.contains("kernel"), "unexpected err: {err}");
    }

    #[test]
    fn rejects_unknown_keys_inside_known_tables() {
        let file = from_str("[output]\ndir = \"out\"\nthreads = 4\n").unwrap();
        let err = BuildSettings::from_file(&file, &Overrides::default())
            .unwrap_err()
            .to_string();
        assert!(err.contains("threads"), "unexpected err: {err}");
    }

    #[test]
    fn inline_documents_refuse_layering_keys() {
        let err = from_str("extends = \"base.toml\"\n").unwrap_err().to_string();
        assert!(err.contains("cannot use 'extends'"), "unexpected err: {err}");

        let err = from_str("[qemu]\nimports = [\"gfx.toml\"]\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("cannot use 'imports'"), "unexpected err: {err}");
    }

    #[test]
    fn rejects_bad_feature_names() {
        let file = from_str("[qemu.features]\n\"--evil\" = true\n").unwrap();
        let err = BuildSettings::from_file(&file, &Overrides::default())
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid name '--evil'"), "unexpected err: {err}");
    }

    #[test]
    fn rejects_non_numeric_versions() {
        let file = from_str("[sources]\nqemu = \"latest\"\n").unwrap();
        assert!(BuildSettings::from_file(&file, &Overrides::default()).is_err());
    }
}
