use crate::components::{Component, PlanCtx, fetch_task};
use crate::error::Result;
use crate::planner::{Plan, Task};
use crate::sources;

pub struct E2fsprogsComponent;

/// Binaries collected into the bundle, relative to the e2fsprogs tree.
pub const TOOLS: &[&str] = &[
    "misc/mke2fs",
    "e2fsck/e2fsck",
    "resize/resize2fs",
    "debugfs/debugfs",
];

impl Component for E2fsprogsComponent {
    fn id(&self) -> &'static str {
        "e2fsprogs"
    }

    fn plan(&self, ctx: &PlanCtx<'_>, plan: &mut Plan) -> Result<()> {
        let r = ctx.resolved;
        let src = sources::e2fsprogs(&ctx.settings.sources.e2fsprogs);
        let tree = format!("{}/{}", ctx.work_dir(), src.dir_name);

        plan.add(fetch_task(ctx, self.id(), "Fetch e2fsprogs", &src))?;

        let mut configure = vec![
            "./configure".to_string(),
            format!("--host={}", r.toolchain.host_triple),
            "--disable-nls".into(),
            "--disable-fuse2fs".into(),
        ];
        if r.libc.is_static() {
            configure.push(format!("CC={}", r.toolchain.userland_cc()));
            configure.push("LDFLAGS=-static".into());
        }
        plan.add(
            Task::new(self.id(), "configure", "Configure e2fsprogs")
                .after("e2fsprogs:source")
                .workdir(tree.as_str())
                .command(configure),
        )?;

        plan.add(
            Task::new(self.id(), "build", "Build e2fsprogs")
                .after("e2fsprogs.configure")
                .provides("artifact:e2fsprogs")
                .workdir(tree.as_str())
                .command(["make".to_string(), ctx.jobs_flag()]),
        )?;
        Ok(())
    }
}
