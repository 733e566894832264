//! 两阶段演示
//!
//! 1. 关节空间 PD：从 home 位形移动到关节目标
//! 2. 操作空间 PD：把末端移动到笛卡尔目标，零空间保持 home 姿态

use crate::args::DemoArgs;
use anyhow::{Context, Result, bail};
use armctl_sdk::prelude::*;
use std::path::Path;
use tracing::info;

/// 场景中的箱子：机械臂先移动到其上方，再向下触碰
const BOX_OBJECT: &str = "box";

/// 箱子位置（m）
const BOX_POSITION: [f64; 3] = [-0.45, -0.45, 0.05];

/// 运行演示；任一目标未收敛时返回错误
pub fn run(args: &DemoArgs) -> Result<()> {
    let controller_config = args.controller_config()?;
    let mut sim = build_simulator(args)?;

    let joint_goal =
        JointPositionGoal::new(&args.joints, sim.dof()).context("无效的关节目标")?;
    let ee_goal = EePositionGoal::new(&args.ee).context("无效的末端目标")?;

    let mut controller = MotionController::new(controller_config)?;

    println!("⏳ Phase 1: joint space control");
    run_phase(&mut controller, &mut sim, joint_goal)?;

    println!("⏳ Phase 2: operational space control");
    run_phase(&mut controller, &mut sim, ee_goal)?;

    if controller.degraded_ticks() > 0 {
        println!(
            "⚠️  Orientation control dropped for {} singular ticks",
            controller.degraded_ticks()
        );
    }
    println!("✅ Both goals reached");
    Ok(())
}

/// 创建仿真器、接入遥测并放置箱子
fn build_simulator(args: &DemoArgs) -> Result<RobotSimulator<Box<dyn Telemetry>>> {
    let mut sim = RobotSimulator::new(ArmModel::panda(), args.simulator_config()?)
        .context("创建仿真器失败")?
        .with_telemetry(telemetry_backend(args.telemetry.as_deref())?);
    sim.add_object(BOX_OBJECT, Vector3::from(BOX_POSITION));
    Ok(sim)
}

fn run_phase<S: StateProvider>(
    controller: &mut MotionController,
    sim: &mut S,
    goal: impl Into<Goal>,
) -> Result<RunReport> {
    let goal = goal.into();
    let kind = goal.kind();
    controller.set_goal(goal);

    let report =
        run_to_convergence(controller, sim).with_context(|| format!("{kind} 控制循环失败"))?;
    println!("{report}");

    if !report.converged() {
        bail!(
            "{kind} goal timed out after {:.3}s, final error {:.6}",
            report.elapsed_s,
            report.final_error
        );
    }
    Ok(report)
}

fn telemetry_backend(path: Option<&Path>) -> Result<Box<dyn Telemetry>> {
    Ok(match path {
        Some(path) => {
            info!("Writing telemetry to {}", path.display());
            let telemetry = JsonLinesTelemetry::create(path)
                .with_context(|| format!("创建遥测文件失败: {}", path.display()))?;
            Box::new(telemetry)
        },
        None => Box::new(NullTelemetry),
    })
}
