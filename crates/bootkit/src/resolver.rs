use serde::Serialize;

use crate::error::{Error, Result};
use crate::features::{self, FeatureDirective};
use crate::kernel::KernelConfig;
use crate::packages::{BASE_BUILD_TOOLS, MUSL_PACKAGES, PROFILE_INVARIANT_LIBS, PackageSet};
use crate::target::{Architecture, BuildProfile, LibcVariant};

/// Validated input to [`resolve`]. Built once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub arch: Architecture,
    pub profile: BuildProfile,
    pub libc: LibcVariant,
    pub feature_overrides: Vec<FeatureDirective>,
    pub extra_packages: Vec<String>,
}

impl BuildRequest {
    pub fn new(arch: Architecture, profile: BuildProfile, libc: LibcVariant) -> Self {
        Self {
            arch,
            profile,
            libc,
            feature_overrides: Vec::new(),
            extra_packages: Vec::new(),
        }
    }

    /// Parses all three names before anything else is looked at, architecture first.
    pub fn parse(arch: &str, profile: &str, libc: &str) -> Result<Self> {
        let arch = arch.parse()?;
        let profile = profile.parse()?;
        let libc = libc.parse()?;
        Ok(Self::new(arch, profile, libc))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    /// The kernel is freestanding and always uses the glibc cross compiler.
    pub kernel_cross_prefix: &'static str,
    pub userland_cross_prefix: &'static str,
    pub host_triple: &'static str,
}

impl Toolchain {
    pub fn for_target(arch: Architecture, libc: LibcVariant) -> Self {
        let userland = match libc {
            LibcVariant::Glibc => arch.gnu_cross_prefix(),
            LibcVariant::Musl => arch.musl_cross_prefix(),
        };
        Self {
            kernel_cross_prefix: arch.gnu_cross_prefix(),
            userland_cross_prefix: userland,
            host_triple: userland.trim_end_matches('-'),
        }
    }

    pub fn userland_cc(&self) -> String {
        format!("{}gcc", self.userland_cross_prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QemuConfig {
    pub directives: Vec<FeatureDirective>,
    pub static_link: bool,
    pub cc_override: Option<String>,
}

impl QemuConfig {
    /// Toolchain flags followed by one flag per directive. The caller adds
    /// `--prefix` and `--target-list`.
    pub fn configure_flags(&self, toolchain: &Toolchain) -> Vec<String> {
        let mut out = vec![format!("--cross-prefix={}", toolchain.userland_cross_prefix)];
        if self.static_link {
            out.push("--static".into());
        }
        if let Some(cc) = &self.cc_override {
            out.push(format!("--cc={cc}"));
        }
        out.extend(self.directives.iter().map(FeatureDirective::to_flag));
        out
    }

    pub fn enabled_features(&self) -> Vec<&str> {
        features::enabled_names(&self.directives)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub architecture: Architecture,
    pub profile: BuildProfile,
    pub libc: LibcVariant,
    pub toolchain: Toolchain,
    pub qemu: QemuConfig,
    pub kernel: KernelConfig,
    pub packages: PackageSet,
}

impl ResolvedConfig {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::msg(format!("json encode error: {e}")))
    }

    /// SHA-256 over the canonical JSON form.
    pub fn fingerprint(&self) -> Result<String> {
        use sha2::{Digest, Sha256};

        let bytes = serde_json::to_vec(self)
            .map_err(|e| Error::msg(format!("json encode error: {e}")))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

pub fn resolve(req: &BuildRequest) -> ResolvedConfig {
    let builtin = features::profile_directives(req.profile);
    for (b, o) in features::flipped(&builtin, &req.feature_overrides) {
        tracing::warn!(
            feature = %o.name,
            profile = %req.profile,
            from = ?b.state,
            to = ?o.state,
            "override flips a builtin profile directive"
        );
    }
    let directives = features::apply_overrides(&builtin, &req.feature_overrides);

    let toolchain = Toolchain::for_target(req.arch, req.libc);
    let qemu = QemuConfig {
        static_link: req.libc.is_static(),
        cc_override: req.libc.is_static().then(|| toolchain.userland_cc()),
        directives,
    };

    let mut packages = PackageSet::default();
    packages.extend(BASE_BUILD_TOOLS.iter().copied());
    packages.extend(PROFILE_INVARIANT_LIBS.iter().copied());
    for name in qemu.enabled_features() {
        packages.extend(features::feature_packages(name).iter().copied());
    }
    packages.insert(req.arch.kernel_cross_package());
    if req.libc == LibcVariant::Musl {
        packages.extend(MUSL_PACKAGES.iter().copied());
        packages.insert(req.arch.musl_compiler_package());
    }
    packages.extend(req.extra_packages.iter().map(String::as_str));

    tracing::debug!(
        arch = %req.arch,
        profile = %req.profile,
        libc = %req.libc,
        directives = qemu.directives.len(),
        packages = packages.len(),
        "resolved build configuration"
    );

    ResolvedConfig {
        architecture: req.arch,
        profile: req.profile,
        libc: req.libc,
        toolchain,
        kernel: KernelConfig::for_arch(req.arch),
        qemu,
        packages,
    }
}

pub fn resolve_str(arch: &str, profile: &str, libc: &str) -> Result<ResolvedConfig> {
    let req = BuildRequest::parse(arch, profile, libc)?;
    Ok(resolve(&req))
}
