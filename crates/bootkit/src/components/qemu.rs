use crate::components::{Component, PlanCtx, fetch_task};
use crate::error::Result;
use crate::planner::{Plan, Task};
use crate::sources;

pub struct QemuComponent;

impl Component for QemuComponent {
    fn id(&self) -> &'static str {
        "qemu"
    }

    fn plan(&self, ctx: &PlanCtx<'_>, plan: &mut Plan) -> Result<()> {
        let r = ctx.resolved;
        let src = sources::qemu(&ctx.settings.sources.qemu);
        let tree = format!("{}/{}", ctx.work_dir(), src.dir_name);

        plan.add(fetch_task(ctx, self.id(), "Fetch QEMU", &src))?;

        // Prefix and target list belong to the caller; the rest comes from the profile.
        let mut configure = vec![
            "./configure".to_string(),
            format!("--prefix={}", ctx.qemu_prefix()),
            format!("--target-list={}", r.architecture.qemu_target()),
        ];
        configure.extend(r.qemu.configure_flags(&r.toolchain));
        plan.add(
            Task::new(self.id(), "configure", format!("Configure QEMU ({})", r.profile))
                .after("qemu:source")
                .workdir(tree.as_str())
                .command(configure),
        )?;

        plan.add(
            Task::new(self.id(), "build", "Build QEMU")
                .after("qemu.configure")
                .provides("artifact:qemu")
                .workdir(tree.as_str())
                .command(["make".to_string(), ctx.jobs_flag()]),
        )?;
        Ok(())
    }
}
