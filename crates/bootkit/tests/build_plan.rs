use std::path::Path;

use bootkit::components::build_plan_in;
use bootkit::config::{self, BuildSettings, Overrides};
use bootkit::planner::Plan;
use bootkit::resolve;

const ROOT: &str = "/srv/build";

fn plan_in(src: &str, root: &str) -> bootkit::Result<Plan> {
    let file = config::from_str(src)?;
    let settings = BuildSettings::from_file(&file, &Overrides::default())?;
    let resolved = resolve(&settings.request);
    build_plan_in(&resolved, &settings, Path::new(root))
}

fn plan_for(src: &str) -> bootkit::Result<Plan> {
    plan_in(src, ROOT)
}

fn flat(plan: &Plan, id: &str) -> Vec<String> {
    plan.get(id)
        .unwrap_or_else(|| panic!("missing task {id}"))
        .commands
        .iter()
        .map(|argv| argv.join(" "))
        .collect()
}

#[test]
fn builds_come_after_fetch_and_bundle_comes_last() {
    let plan = plan_for("[output]\njobs = 4\n").unwrap();
    let ids: Vec<&str> = plan.ordered().unwrap().iter().map(|t| t.id.as_str()).collect();
    let pos = |id: &str| ids.iter().position(|x| *x == id).unwrap();

    for c in ["kernel", "qemu", "e2fsprogs"] {
        assert!(pos(&format!("{c}.fetch")) < pos(&format!("{c}.configure")));
        assert!(pos(&format!("{c}.configure")) < pos(&format!("{c}.build")));
        assert!(pos(&format!("{c}.build")) < pos("bundle.collect"));
    }
    assert_eq!(ids.last(), Some(&"bundle.collect"));
}

#[test]
fn kernel_commands_use_arch_conventions() {
    let plan = plan_for(
        r#"
[build]
arch = "arm64"

[output]
jobs = 8
"#,
    )
    .unwrap();
    let configure = flat(&plan, "kernel.configure");
    assert_eq!(
        configure[0],
        "make ARCH=arm64 CROSS_COMPILE=aarch64-linux-gnu- defconfig"
    );
    assert!(configure[1].starts_with("scripts/config --file .config --enable VIRTIO"));
    assert_eq!(
        flat(&plan, "kernel.build"),
        vec!["make ARCH=arm64 CROSS_COMPILE=aarch64-linux-gnu- -j8 Image"]
    );
    assert_eq!(
        plan.get("kernel.build").unwrap().workdir.as_deref(),
        Some("/srv/build/out/arm64/work/linux-6.6.30")
    );
}

#[test]
fn qemu_configure_has_caller_args_then_profile_flags() {
    let plan = plan_for(
        r#"
[build]
profile = "minimal"
libc = "musl"
"#,
    )
    .unwrap();
    let task = plan.get("qemu.configure").unwrap();
    let argv = &task.commands[0];
    assert_eq!(argv[0], "./configure");
    assert_eq!(argv[1], "--prefix=/srv/build/out/amd64/qemu");
    assert_eq!(argv[2], "--target-list=x86_64-softmmu");
    assert!(argv.contains(&"--static".to_string()));
    assert!(argv.contains(&"--enable-slirp".to_string()));
    assert!(argv.contains(&"--disable-gtk".to_string()));
}

#[test]
fn e2fsprogs_static_build_sets_compiler() {
    let plan = plan_for("[build]\nlibc = \"musl\"\n").unwrap();
    let configure = flat(&plan, "e2fsprogs.configure");
    assert!(configure[0].contains("--host=x86_64-linux-musl"));
    assert!(configure[0].contains("CC=x86_64-linux-musl-gcc"));
    assert!(configure[0].contains("LDFLAGS=-static"));

    let plan = plan_for("").unwrap();
    let configure = flat(&plan, "e2fsprogs.configure");
    assert!(!configure[0].contains("LDFLAGS"));
}

#[test]
fn fetch_urls_follow_source_versions() {
    let plan = plan_for(
        r#"
[sources]
kernel = "5.15.160"
qemu = "8.2.2"
"#,
    )
    .unwrap();
    let kernel = flat(&plan, "kernel.fetch").join("\n");
    assert!(
        kernel.contains("https://cdn.kernel.org/pub/linux/kernel/v5.x/linux-5.15.160.tar.xz"),
        "{kernel}"
    );
    let qemu = flat(&plan, "qemu.fetch").join("\n");
    assert!(qemu.contains("https://download.qemu.org/qemu-8.2.2.tar.xz"), "{qemu}");
}

#[test]
fn bundle_collects_kernel_qemu_and_fs_tools() {
    let plan = plan_for("[output]\ndir = \"dist/\"\n").unwrap();
    let collect = flat(&plan, "bundle.collect").join("\n");
    for dest in [
        "/srv/build/dist/amd64/bundle/bzImage",
        "/srv/build/dist/amd64/bundle/qemu-system-x86_64",
        "/srv/build/dist/amd64/bundle/bin/mke2fs",
        "/srv/build/dist/amd64/bundle/bin/resize2fs",
    ] {
        assert!(collect.contains(dest), "missing {dest} in:\n{collect}");
    }
}

#[test]
fn qemu_install_prefix_is_absolute_and_feeds_the_bundle() {
    for arch in ["amd64", "arm64"] {
        let plan = plan_for(&format!("[build]\narch = \"{arch}\"\n")).unwrap();
        let configure = &plan.get("qemu.configure").unwrap().commands[0];
        let prefix = configure
            .iter()
            .find_map(|a| a.strip_prefix("--prefix="))
            .expect("configure sets --prefix");
        assert!(Path::new(prefix).is_absolute(), "{prefix}");

        let workdir = plan.get("qemu.build").unwrap().workdir.as_deref().unwrap();
        assert!(Path::new(workdir).is_absolute(), "{workdir}");

        let collect = &plan.get("bundle.collect").unwrap().commands;
        let binary = if arch == "amd64" {
            "qemu-system-x86_64"
        } else {
            "qemu-system-aarch64"
        };
        let installed = format!("{prefix}/bin/{binary}");
        assert!(
            collect.iter().any(|argv| argv.contains(&installed)),
            "bundle does not collect {installed}: {collect:?}"
        );
    }
}

#[test]
fn absolute_output_dir_ignores_plan_root() {
    let plan = plan_for("[output]\ndir = \"/var/tmp/boot\"\n").unwrap();
    let configure = &plan.get("qemu.configure").unwrap().commands[0];
    assert_eq!(configure[1], "--prefix=/var/tmp/boot/amd64/qemu");
}

#[test]
fn relative_plan_root_is_rejected() {
    let err = plan_in("", "build").unwrap_err().to_string();
    assert!(err.contains("must be absolute"), "{err}");
}

#[test]
fn dot_output_lists_every_task() {
    let plan = plan_for("").unwrap();
    let dot = plan.to_dot().unwrap();
    assert!(dot.starts_with("digraph plan {"));
    for task in plan.tasks() {
        assert!(dot.contains(&format!("\"{}\"", task.id)));
    }
    assert!(dot.contains("\"kernel.build\" -> \"bundle.collect\""));
}
