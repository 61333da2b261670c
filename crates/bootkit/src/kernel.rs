//! Kernel configuration for the sandbox guest.
//!
//! The kernel is configured from `defconfig` plus a fixed list of
//! `scripts/config` edits. The list has no profile axis: every build profile
//! gets the same kernel, only the architecture-specific console and platform
//! symbols differ.

use serde::Serialize;

use crate::features::FeatureState;
use crate::target::Architecture;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KconfigDirective {
    pub symbol: &'static str,
    pub state: FeatureState,
}

impl KconfigDirective {
    /// Arguments for `scripts/config`, e.g. `["--enable", "VIRTIO"]`.
    pub fn to_args(&self) -> [String; 2] {
        let op = match self.state {
            FeatureState::Enabled => "--enable",
            FeatureState::Disabled => "--disable",
        };
        [op.to_string(), self.symbol.to_string()]
    }
}

const COMMON_ENABLE: &[&str] = &[
    "VIRTIO",
    "VIRTIO_PCI",
    "VIRTIO_MMIO",
    "VIRTIO_BLK",
    "VIRTIO_NET",
    "VIRTIO_CONSOLE",
    "VIRTIO_BALLOON",
    "HW_RANDOM_VIRTIO",
    "NET_9P",
    "NET_9P_VIRTIO",
    "9P_FS",
    "9P_FS_POSIX_ACL",
    "EXT4_FS",
    "TMPFS",
    "DEVTMPFS",
    "DEVTMPFS_MOUNT",
    "BLK_DEV_INITRD",
    "RD_GZIP",
    "BINFMT_SCRIPT",
    "PRINTK",
    "UNIX",
    "INET",
    "VSOCKETS",
    "VIRTIO_VSOCKETS",
    "CGROUPS",
    "NAMESPACES",
    "SECCOMP",
];

const COMMON_DISABLE: &[&str] = &[
    "MODULES",
    "SOUND",
    "DRM",
    "WLAN",
    "WIRELESS",
    "BT",
    "USB_SUPPORT",
    "DEBUG_INFO",
];

const AMD64_ENABLE: &[&str] = &[
    "SERIAL_8250",
    "SERIAL_8250_CONSOLE",
    "KVM_GUEST",
    "PARAVIRT",
];

const ARM64_ENABLE: &[&str] = &[
    "SERIAL_AMBA_PL011",
    "SERIAL_AMBA_PL011_CONSOLE",
    "PCI_HOST_GENERIC",
];

/// The full ordered `scripts/config` edit list for `arch`.
pub fn kconfig_directives(arch: Architecture) -> Vec<KconfigDirective> {
    let arch_enable = match arch {
        Architecture::Amd64 => AMD64_ENABLE,
        Architecture::Arm64 => ARM64_ENABLE,
    };
    COMMON_ENABLE
        .iter()
        .chain(arch_enable)
        .map(|&symbol| KconfigDirective {
            symbol,
            state: FeatureState::Enabled,
        })
        .chain(COMMON_DISABLE.iter().map(|&symbol| KconfigDirective {
            symbol,
            state: FeatureState::Disabled,
        }))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelConfig {
    pub make_arch: &'static str,
    pub defconfig_target: &'static str,
    pub image_target: &'static str,
    pub image_path: &'static str,
    pub bundle_name: &'static str,
    pub directives: Vec<KconfigDirective>,
}

impl KernelConfig {
    pub fn for_arch(arch: Architecture) -> Self {
        Self {
            make_arch: arch.kernel_arch(),
            defconfig_target: "defconfig",
            image_target: arch.kernel_image_target(),
            image_path: arch.kernel_image_path(),
            bundle_name: arch.kernel_image_target(),
            directives: kconfig_directives(arch),
        }
    }

    pub fn scripts_config_args(&self) -> Vec<String> {
        self.directives.iter().flat_map(|d| d.to_args()).collect()
    }
}
