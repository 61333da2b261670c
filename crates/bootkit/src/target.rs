use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

/// Target CPU architecture of the boot bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Amd64,
    Arm64,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Architecture::Amd64, Architecture::Arm64];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }

    /// Value of `ARCH=` for the kernel build system.
    pub fn kernel_arch(self) -> &'static str {
        match self {
            Self::Amd64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }

    pub fn kernel_image_target(self) -> &'static str {
        match self {
            Self::Amd64 => "bzImage",
            Self::Arm64 => "Image",
        }
    }

    /// Image location relative to the kernel source tree after a build.
    pub fn kernel_image_path(self) -> &'static str {
        match self {
            Self::Amd64 => "arch/x86/boot/bzImage",
            Self::Arm64 => "arch/arm64/boot/Image",
        }
    }

    pub fn gnu_cross_prefix(self) -> &'static str {
        match self {
            Self::Amd64 => "x86_64-linux-gnu-",
            Self::Arm64 => "aarch64-linux-gnu-",
        }
    }

    pub fn musl_cross_prefix(self) -> &'static str {
        match self {
            Self::Amd64 => "x86_64-linux-musl-",
            Self::Arm64 => "aarch64-linux-musl-",
        }
    }

    pub fn qemu_target(self) -> &'static str {
        match self {
            Self::Amd64 => "x86_64-softmmu",
            Self::Arm64 => "aarch64-softmmu",
        }
    }

    pub fn qemu_binary(self) -> &'static str {
        match self {
            Self::Amd64 => "qemu-system-x86_64",
            Self::Arm64 => "qemu-system-aarch64",
        }
    }

    pub fn kernel_cross_package(self) -> &'static str {
        match self {
            Self::Amd64 => "gcc-x86-64-linux-gnu",
            Self::Arm64 => "gcc-aarch64-linux-gnu",
        }
    }

    pub fn musl_compiler_package(self) -> &'static str {
        match self {
            Self::Amd64 => "x86_64-linux-musl-cross",
            Self::Arm64 => "aarch64-linux-musl-cross",
        }
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amd64" => Ok(Self::Amd64),
            "arm64" => Ok(Self::Arm64),
            _ => Err(Error::UnsupportedArchitecture(s.to_string())),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named preset of QEMU features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    Minimal,
    Default,
    Full,
}

impl BuildProfile {
    /// Ordered from smallest to largest feature set.
    pub const ALL: [BuildProfile; 3] = [
        BuildProfile::Minimal,
        BuildProfile::Default,
        BuildProfile::Full,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Default => "default",
            Self::Full => "full",
        }
    }
}

impl FromStr for BuildProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "default" => Ok(Self::Default),
            "full" => Ok(Self::Full),
            _ => Err(Error::UnsupportedProfile(s.to_string())),
        }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibcVariant {
    Glibc,
    Musl,
}

impl LibcVariant {
    pub const ALL: [LibcVariant; 2] = [LibcVariant::Glibc, LibcVariant::Musl];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Glibc => "glibc",
            Self::Musl => "musl",
        }
    }

    pub fn is_static(self) -> bool {
        matches!(self, Self::Musl)
    }
}

impl FromStr for LibcVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "glibc" => Ok(Self::Glibc),
            "musl" => Ok(Self::Musl),
            _ => Err(Error::UnsupportedLibc(s.to_string())),
        }
    }
}

impl fmt::Display for LibcVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
