use std::path::{Path, PathBuf};

use crate::config::BuildSettings;
use crate::error::{Error, Result};
use crate::planner::{Plan, Task};
use crate::resolver::ResolvedConfig;

pub mod bundle;
pub mod e2fsprogs;
pub mod kernel;
pub mod qemu;

/// Inputs shared by every component while planning.
#[derive(Debug)]
pub struct PlanCtx<'a> {
    pub resolved: &'a ResolvedConfig,
    pub settings: &'a BuildSettings,
    pub jobs: usize,
    /// Absolute output directory; a relative `output.dir` is joined onto the planning root.
    pub out_dir: PathBuf,
}

impl<'a> PlanCtx<'a> {
    pub fn new(resolved: &'a ResolvedConfig, settings: &'a BuildSettings, root: &Path) -> Self {
        let jobs = match settings.output.jobs {
            0 => num_cpus::get().max(1),
            n => n,
        };
        Self {
            resolved,
            settings,
            jobs,
            out_dir: root.join(&settings.output.dir),
        }
    }

    /// `<out>/<arch>`
    pub fn arch_dir(&self) -> String {
        self.out_dir
            .join(self.resolved.architecture.as_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Install prefix handed to QEMU's configure; the bundle collects from `<prefix>/bin`.
    pub fn qemu_prefix(&self) -> String {
        format!("{}/qemu", self.arch_dir())
    }

    pub fn work_dir(&self) -> String {
        format!("{}/work", self.arch_dir())
    }

    pub fn bundle_dir(&self) -> String {
        format!("{}/bundle", self.arch_dir())
    }

    pub fn jobs_flag(&self) -> String {
        format!("-j{}", self.jobs)
    }
}

pub trait Component {
    fn id(&self) -> &'static str;
    fn plan(&self, ctx: &PlanCtx<'_>, plan: &mut Plan) -> Result<()>;
}

pub fn builtin_components() -> Vec<Box<dyn Component>> {
    vec![
        Box::new(kernel::KernelComponent),
        Box::new(qemu::QemuComponent),
        Box::new(e2fsprogs::E2fsprogsComponent),
        Box::new(bundle::BundleComponent),
    ]
}

/// Plans relative to the current directory.
pub fn build_plan(resolved: &ResolvedConfig, settings: &BuildSettings) -> Result<Plan> {
    let root = std::env::current_dir()
        .map_err(|e| Error::msg(format!("cannot determine current directory: {e}")))?;
    build_plan_in(resolved, settings, &root)
}

/// Runs every builtin component and checks the result orders cleanly. `root`
/// must be absolute; every rendered path is anchored on it.
pub fn build_plan_in(
    resolved: &ResolvedConfig,
    settings: &BuildSettings,
    root: &Path,
) -> Result<Plan> {
    if !root.is_absolute() {
        return Err(Error::msg(format!(
            "plan root must be absolute: {}",
            root.display()
        )));
    }
    let ctx = PlanCtx::new(resolved, settings, root);
    let mut plan = Plan::default();
    for c in builtin_components() {
        c.plan(&ctx, &mut plan)?;
        tracing::debug!(component = c.id(), tasks = plan.len(), "planned component");
    }
    plan.ordered()?;
    Ok(plan)
}

/// Download and unpack steps shared by every upstream source.
pub(crate) fn fetch_task(
    ctx: &PlanCtx<'_>,
    component: &str,
    label: &str,
    src: &crate::sources::SourceArchive,
) -> Task {
    let work = ctx.work_dir();
    let archive = format!("{work}/{}", src.file_name);
    Task::new(component, "fetch", label)
        .provides(format!("{component}:source"))
        .command(["mkdir", "-p", work.as_str()])
        .command(["curl", "-fL", "-o", archive.as_str(), src.url.as_str()])
        .command(["tar", "-xf", archive.as_str(), "-C", work.as_str()])
}
