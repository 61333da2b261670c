use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use bootkit::config::{self, BuildFile, BuildSettings, Overrides};
use bootkit::features;
use bootkit::{BuildProfile, Result, resolve};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log at debug level (BOOTKIT_LOG overrides this)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct Target {
    /// Build file (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// amd64 | arm64
    #[arg(long)]
    arch: Option<String>,
    /// minimal | default | full
    #[arg(long)]
    profile: Option<String>,
    /// glibc | musl
    #[arg(long)]
    libc: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved build configuration
    Resolve {
        #[command(flatten)]
        target: Target,
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Print host packages, one per line
    Packages {
        #[command(flatten)]
        target: Target,
    },
    /// Print QEMU configure flags, one per line
    QemuArgs {
        #[command(flatten)]
        target: Target,
    },
    /// Print the scripts/config arguments applied to the kernel
    KernelConfig {
        #[command(flatten)]
        target: Target,
    },
    /// List the builtin profiles and their enabled QEMU features
    Profiles,
    /// Print the ordered build plan
    Plan {
        #[command(flatten)]
        target: Target,
        /// Print GraphViz dot instead of a linear plan
        #[arg(long)]
        dot: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = bootkit::logging::init(cli.verbose) {
        eprintln!("warning: {e}");
    }
    if let Err(e) = run(cli.cmd) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cmd: Command) -> Result<()> {
    match cmd {
        Command::Resolve { target, json } => cmd_resolve(&target, json),
        Command::Packages { target } => {
            let resolved = resolve(&load_settings(&target)?.request);
            for p in resolved.packages.iter() {
                println!("{p}");
            }
            Ok(())
        }
        Command::QemuArgs { target } => {
            let resolved = resolve(&load_settings(&target)?.request);
            for flag in resolved.qemu.configure_flags(&resolved.toolchain) {
                println!("{flag}");
            }
            Ok(())
        }
        Command::KernelConfig { target } => {
            let resolved = resolve(&load_settings(&target)?.request);
            for pair in resolved.kernel.scripts_config_args().chunks(2) {
                println!("{}", pair.join(" "));
            }
            Ok(())
        }
        Command::Profiles => {
            cmd_profiles();
            Ok(())
        }
        Command::Plan { target, dot } => cmd_plan(&target, dot),
    }
}

fn load_settings(target: &Target) -> Result<BuildSettings> {
    let file = match &target.config {
        Some(path) => config::load(path)?,
        None => BuildFile::empty(),
    };
    let cli = Overrides {
        arch: target.arch.clone(),
        profile: target.profile.clone(),
        libc: target.libc.clone(),
    };
    BuildSettings::from_file(&file, &cli)
}

fn cmd_resolve(target: &Target, json: bool) -> Result<()> {
    let settings = load_settings(target)?;
    let resolved = resolve(&settings.request);
    tracing::info!(
        arch = %resolved.architecture,
        profile = %resolved.profile,
        libc = %resolved.libc,
        "resolved"
    );

    if json {
        println!("{}", resolved.to_json_pretty()?);
        return Ok(());
    }

    println!("architecture: {}", resolved.architecture);
    println!("profile:      {}", resolved.profile);
    println!("libc:         {}", resolved.libc);
    println!("fingerprint:  {}", resolved.fingerprint()?);
    println!("toolchain:");
    println!("  kernel:   {}", resolved.toolchain.kernel_cross_prefix);
    println!("  userland: {}", resolved.toolchain.userland_cross_prefix);
    println!("kernel:");
    println!("  target:   {}", resolved.kernel.image_target);
    println!("  image:    {}", resolved.kernel.image_path);
    println!("qemu:");
    for d in &resolved.qemu.directives {
        println!("  {}", d.to_flag());
    }
    println!("packages:");
    for p in resolved.packages.iter() {
        println!("  {p}");
    }
    Ok(())
}

fn cmd_profiles() {
    for profile in BuildProfile::ALL {
        let directives = features::profile_directives(profile);
        let enabled = features::enabled_names(&directives);
        println!("{:<8} {}", profile.as_str(), enabled.join(" "));
    }
}

fn cmd_plan(target: &Target, dot: bool) -> Result<()> {
    let settings = load_settings(target)?;
    let resolved = resolve(&settings.request);
    let plan = bootkit::components::build_plan(&resolved, &settings)?;

    if dot {
        print!("{}", plan.to_dot()?);
        return Ok(());
    }

    for (i, task) in plan.ordered()?.iter().enumerate() {
        println!(
            "{:>2}. {:<22}  {:<10} {:<10}  {}",
            i + 1,
            task.id,
            task.component,
            task.phase,
            task.label
        );
        if let Some(dir) = &task.workdir {
            println!("      (in {dir})");
        }
        for argv in &task.commands {
            println!("      $ {}", argv.join(" "));
        }
    }
    Ok(())
}
