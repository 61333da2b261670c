use crate::components::{Component, PlanCtx};
use crate::error::Result;
use crate::planner::{Plan, Task};
use crate::sources;

pub struct BundleComponent;

/// Where one artifact comes from and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub source: String,
    pub dest: String,
}

/// The final `<out>/<arch>/bundle` layout.
pub fn layout(ctx: &PlanCtx<'_>) -> Result<Vec<BundleEntry>> {
    let r = ctx.resolved;
    let s = &ctx.settings.sources;
    let work = ctx.work_dir();
    let bundle = ctx.bundle_dir();

    let linux = sources::kernel(&s.kernel)?;
    let mut out = vec![
        BundleEntry {
            source: format!("{work}/{}/{}", linux.dir_name, r.kernel.image_path),
            dest: format!("{bundle}/{}", r.kernel.bundle_name),
        },
        BundleEntry {
            source: format!("{}/bin/{}", ctx.qemu_prefix(), r.architecture.qemu_binary()),
            dest: format!("{bundle}/{}", r.architecture.qemu_binary()),
        },
    ];
    let e2fs = sources::e2fsprogs(&s.e2fsprogs);
    for tool in super::e2fsprogs::TOOLS {
        let name = tool.rsplit('/').next().unwrap_or(tool);
        out.push(BundleEntry {
            source: format!("{work}/{}/{tool}", e2fs.dir_name),
            dest: format!("{bundle}/bin/{name}"),
        });
    }
    Ok(out)
}

impl Component for BundleComponent {
    fn id(&self) -> &'static str {
        "bundle"
    }

    fn plan(&self, ctx: &PlanCtx<'_>, plan: &mut Plan) -> Result<()> {
        let mut task = Task::new(self.id(), "collect", "Collect boot bundle")
            .after("artifact:kernel")
            .after("artifact:qemu")
            .after("artifact:e2fsprogs")
            .provides("bundle:done");
        // QEMU installs into its prefix before it can be collected.
        let qemu_tree = format!(
            "{}/{}",
            ctx.work_dir(),
            sources::qemu(&ctx.settings.sources.qemu).dir_name
        );
        task = task.command(["make", "-C", qemu_tree.as_str(), "install"]);
        for entry in layout(ctx)? {
            task = task.command([
                "install",
                "-D",
                "-m",
                "0755",
                entry.source.as_str(),
                entry.dest.as_str(),
            ]);
        }
        plan.add(task)
    }
}
