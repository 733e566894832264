//! Loop Runner - 控制循环驱动
//!
//! 每个 tick 依次执行一次 `update_control()` 和一次 `step()`，直到控制器报告结束。
//! 驱动器不了解控制律内部细节，也不直接读写目标或仿真状态。
//!
//! # 终止
//!
//! - 循环只在 `controller.is_done()` 为 true 时正常结束，没有循环级超时
//! - 超时是目标 / 控制器的属性，在 `is_done()` 内判定
//! - "结束"不等于"收敛"：调用方应检查 [`RunReport::termination`] 和最终误差
//! - `update_control()` 或 `step()` 出错时立即返回错误
//!
//! # 示例
//!
//! ```rust,ignore
//! use armctl_control::{run_to_convergence, Termination};
//!
//! controller.set_goal(goal);
//! let report = run_to_convergence(&mut controller, &mut sim)?;
//! if report.termination == Termination::TimedOut {
//!     tracing::warn!("Goal not reached, final error {:.6}", report.final_error);
//! }
//! ```

use crate::controller::{MotionController, Termination, TrackingError};
use crate::error::ControlError;
use crate::provider::StateProvider;
use std::fmt;
use tracing::{debug, info, warn};

/// 进度日志间隔（tick）
const PROGRESS_INTERVAL_TICKS: u64 = 1000;

/// 一次运行的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// 执行的 tick 数
    pub ticks: u64,
    /// 本次运行经过的仿真时间（s）
    pub elapsed_s: f64,
    /// 结束时的仿真时间（s）
    pub simulation_time: f64,
    /// 最终误差范数
    pub final_error: f64,
    /// 结束原因
    pub termination: Termination,
}

impl RunReport {
    /// 是否收敛
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time elapsed: {:.3} seconds.", self.simulation_time)?;
        write!(
            f,
            "Final error:  {:.6} ({:?} after {} ticks)",
            self.final_error, self.termination, self.ticks
        )
    }
}

/// 运行控制循环直到控制器报告结束
///
/// 这是一个同步阻塞函数，由 `run_to_convergence` 独占访问状态提供者。
///
/// # 错误
///
/// - 没有目标 → [`ControlError::NoActiveGoal`]（第一个 tick 即返回）
/// - 控制律或提供者错误原样传播
pub fn run_to_convergence<S: StateProvider>(
    controller: &mut MotionController,
    state: &mut S,
) -> Result<RunReport, ControlError> {
    let start_time = state.simulation_time();
    let mut ticks: u64 = 0;

    let termination = loop {
        if let Some(termination) = controller.termination() {
            break termination;
        }

        let error = controller.update_control(state)?;
        state.step().map_err(ControlError::provider)?;
        ticks += 1;

        if ticks % PROGRESS_INTERVAL_TICKS == 0 {
            debug!(
                ticks,
                time = state.simulation_time(),
                error,
                "Control loop progress"
            );
        }
    };

    let simulation_time = state.simulation_time();
    let report = RunReport {
        ticks,
        elapsed_s: simulation_time - start_time,
        simulation_time,
        final_error: controller
            .tracking_error()
            .map(TrackingError::norm)
            .unwrap_or_default(),
        termination,
    };

    match termination {
        Termination::Converged => info!(
            ticks,
            elapsed_s = report.elapsed_s,
            final_error = report.final_error,
            "Goal reached"
        ),
        Termination::TimedOut => warn!(
            ticks,
            elapsed_s = report.elapsed_s,
            final_error = report.final_error,
            "Goal timed out before convergence"
        ),
    }

    Ok(report)
}
