use crate::components::{Component, PlanCtx, fetch_task};
use crate::error::Result;
use crate::planner::{Plan, Task};
use crate::sources;

pub struct KernelComponent;

impl KernelComponent {
    fn make_base(ctx: &PlanCtx<'_>) -> Vec<String> {
        let r = ctx.resolved;
        vec![
            "make".into(),
            format!("ARCH={}", r.kernel.make_arch),
            format!("CROSS_COMPILE={}", r.toolchain.kernel_cross_prefix),
        ]
    }
}

impl Component for KernelComponent {
    fn id(&self) -> &'static str {
        "kernel"
    }

    fn plan(&self, ctx: &PlanCtx<'_>, plan: &mut Plan) -> Result<()> {
        let src = sources::kernel(&ctx.settings.sources.kernel)?;
        let tree = format!("{}/{}", ctx.work_dir(), src.dir_name);
        let kernel = &ctx.resolved.kernel;

        plan.add(fetch_task(ctx, self.id(), "Fetch Linux", &src))?;

        let mut defconfig = Self::make_base(ctx);
        defconfig.push(kernel.defconfig_target.into());
        let mut edit = vec!["scripts/config".to_string(), "--file".into(), ".config".into()];
        edit.extend(kernel.scripts_config_args());
        let mut olddefconfig = Self::make_base(ctx);
        olddefconfig.push("olddefconfig".into());
        plan.add(
            Task::new(self.id(), "configure", "Configure Linux")
                .after("kernel:source")
                .workdir(tree.as_str())
                .command(defconfig)
                .command(edit)
                .command(olddefconfig),
        )?;

        let mut build = Self::make_base(ctx);
        build.push(ctx.jobs_flag());
        build.push(kernel.image_target.into());
        plan.add(
            Task::new(self.id(), "build", "Build Linux")
                .after("kernel.configure")
                .provides("artifact:kernel")
                .workdir(tree.as_str())
                .command(build),
        )?;
        Ok(())
    }
}
