use crate::cli::PlanArgs;
use crate::config::builder::build_config;
use crate::error::Result;
use fepflow::engine::stage::Stage;
use fepflow::workflows::fep;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

pub async fn run(args: PlanArgs) -> Result<()> {
    let app = build_config(&args.pipeline, &args.dest)?;
    let stages = fep::plan(&app.workdir, &app.core_config);
    info!("Planned {} stage(s) for {:?}", stages.len(), &app.workdir);

    print!("{}", render_plan(&stages, &app.workdir));
    Ok(())
}

/// One block per stage: its directory relative to `workdir`, the parameter file
/// it writes, and the commands it issues.
pub fn render_plan(stages: &[Stage], workdir: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Working directory: {}", workdir.display());
    for (i, stage) in stages.iter().enumerate() {
        let directory = stage
            .directory
            .strip_prefix(workdir)
            .ok()
            .filter(|d| !d.as_os_str().is_empty())
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        let _ = writeln!(out, "\n[{}] {} (in {})", i + 1, stage.id, directory);
        for seed in &stage.seeds {
            let _ = writeln!(out, "    copy  {}", seed.source.artifact);
        }
        if let Some(parameters) = &stage.parameters {
            let _ = writeln!(
                out,
                "    write {} ({} entries)",
                parameters.file_name,
                parameters.block.parameters().count()
            );
        }
        for invocation in stage.invocations() {
            let _ = writeln!(out, "    $ {}", invocation.command_line());
        }
    }
    out
}
