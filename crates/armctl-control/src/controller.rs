//! Motion Controller - 目标驱动的 PD 控制器
//!
//! 每个 tick 执行一次控制律求值：
//!
//! - **关节目标**: `q̈ = kp·(q* − q) − kd·q̇`，下发关节加速度（提供者经逆动力学映射为力矩）
//! - **末端目标**: `ẍ = kp·(x* − x) − kd·ẋ`，先做奇异判定：
//!   - 奇异：丢弃姿态行，只下发 3 维位置加速度（降级模式，记录日志，不报错）
//!   - 非奇异：追加姿态 PD 律 `ω̇ = −kp_ori·e_ori − kd_ori·ω`，下发 6 维加速度
//!
//!   零空间姿态保持和重力补偿由提供者在 `set_ee_acceleration()` 内完成。
//!
//! # 状态机
//!
//! ```text
//!            set_goal                 update_control
//! NoGoal ───────────▶ AwaitingFirstEvaluation ───────────▶ Tracking ─┐
//!                            ▲                                 ▲      │ update_control
//!                            └──────────── set_goal ───────────┴──────┘
//! ```
//!
//! `is_done()` 是 `Tracking` 上的谓词，不是独立状态。收敛后控制器不会自行回到
//! `NoGoal`，由控制循环负责停止。
//!
//! # 示例
//!
//! ```rust,ignore
//! use armctl_control::{ControllerConfig, JointPositionGoal, MotionController, PdGains};
//!
//! let mut controller = MotionController::new(ControllerConfig::new(PdGains::new(49.0, 14.0)))?;
//! controller.set_goal(JointPositionGoal::new(&target, 7)?);
//! while !controller.is_done() {
//!     controller.update_control(&mut sim)?;
//!     sim.step()?;
//! }
//! ```

use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::goal::{EePositionGoal, Goal, JointPositionGoal};
use crate::provider::StateProvider;
use nalgebra::{DVector, Vector3};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 跟踪误差
///
/// 最近一次控制律求值得到的残差（关节空间或任务空间）及其范数。
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingError {
    residual: DVector<f64>,
    norm: f64,
}

impl TrackingError {
    fn new(residual: DVector<f64>) -> Self {
        let norm = residual.norm();
        Self { residual, norm }
    }

    /// 残差向量
    pub fn residual(&self) -> &DVector<f64> {
        &self.residual
    }

    /// 残差范数
    pub fn norm(&self) -> f64 {
        self.norm
    }
}

/// 结束原因
///
/// "结束"不等于"收敛"：超时的目标同样让 `is_done()` 返回 true。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// 误差范数低于阈值
    Converged,
    /// 超时，误差可能仍高于阈值
    TimedOut,
}

/// 控制器状态（对外只读视图）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    /// 没有目标
    NoGoal,
    /// 已设置目标，尚未求值（跟踪误差未定义）
    AwaitingFirstEvaluation,
    /// 正在跟踪（跟踪误差已定义）
    Tracking,
}

#[derive(Debug, Clone)]
struct Tracking {
    error: TrackingError,
    /// 目标首次求值时的仿真时间
    started_at: f64,
    /// 最近一次求值时的仿真时间
    last_eval: f64,
}

#[derive(Debug, Clone)]
enum Phase {
    AwaitingFirstEvaluation,
    Tracking(Tracking),
}

#[derive(Debug, Clone)]
enum ControllerState {
    NoGoal,
    Active {
        goal: Goal,
        phase: Phase,
        /// 上一 tick 是否处于奇异降级模式
        degraded: bool,
        degraded_ticks: u64,
    },
}

/// 运动控制器
///
/// 任意时刻最多持有一个目标。`set_goal()` 是跟踪误差唯一的重置点：
/// 切换目标时整体替换状态，旧目标的误差不会泄漏到新目标的收敛判定中。
#[derive(Debug, Clone)]
pub struct MotionController {
    config: ControllerConfig,
    state: ControllerState,
}

impl MotionController {
    /// 创建控制器（无目标）
    ///
    /// # 错误
    ///
    /// 配置校验失败时返回 [`ControlError::InvalidConfig`]。
    pub fn new(config: ControllerConfig) -> Result<Self, ControlError> {
        config.validate()?;
        Ok(Self {
            config,
            state: ControllerState::NoGoal,
        })
    }

    /// 控制器配置
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// 安装新目标
    ///
    /// 无条件丢弃之前的目标，并把跟踪误差重置为未定义，
    /// 因此紧接着的 `is_done()` 一定返回 false。
    pub fn set_goal(&mut self, goal: impl Into<Goal>) {
        let goal = goal.into();
        if let ControllerState::Active { goal: previous, .. } = &self.state {
            debug!("Replacing active goal {}", previous);
        }
        info!("New goal: {}", goal);

        self.state = ControllerState::Active {
            goal,
            phase: Phase::AwaitingFirstEvaluation,
            degraded: false,
            degraded_ticks: 0,
        };
    }

    /// 清除目标，回到 `NoGoal`
    ///
    /// 返回被清除的目标。
    pub fn clear_goal(&mut self) -> Option<Goal> {
        match std::mem::replace(&mut self.state, ControllerState::NoGoal) {
            ControllerState::Active { goal, .. } => Some(goal),
            ControllerState::NoGoal => None,
        }
    }

    /// 当前目标
    pub fn goal(&self) -> Option<&Goal> {
        match &self.state {
            ControllerState::Active { goal, .. } => Some(goal),
            ControllerState::NoGoal => None,
        }
    }

    /// 当前状态
    pub fn status(&self) -> ControllerStatus {
        match &self.state {
            ControllerState::NoGoal => ControllerStatus::NoGoal,
            ControllerState::Active {
                phase: Phase::AwaitingFirstEvaluation,
                ..
            } => ControllerStatus::AwaitingFirstEvaluation,
            ControllerState::Active {
                phase: Phase::Tracking(_),
                ..
            } => ControllerStatus::Tracking,
        }
    }

    /// 最近一次求值的跟踪误差（设置目标后、首次求值前为 `None`）
    pub fn tracking_error(&self) -> Option<&TrackingError> {
        match &self.state {
            ControllerState::Active {
                phase: Phase::Tracking(tracking),
                ..
            } => Some(&tracking.error),
            _ => None,
        }
    }

    /// 当前目标下处于奇异降级模式的 tick 数
    pub fn degraded_ticks(&self) -> u64 {
        match &self.state {
            ControllerState::Active { degraded_ticks, .. } => *degraded_ticks,
            ControllerState::NoGoal => 0,
        }
    }

    /// 执行一次控制律求值并下发命令
    ///
    /// # 返回
    ///
    /// 本次残差的范数。
    ///
    /// # 错误
    ///
    /// - 没有目标 → [`ControlError::NoActiveGoal`]
    /// - 关节目标维度与提供者自由度不一致 → [`ControlError::InvalidGoalDimension`]（不下发命令）
    /// - 提供者下发命令失败 → [`ControlError::Provider`]
    pub fn update_control<S: StateProvider>(&mut self, state: &mut S) -> Result<f64, ControlError> {
        let ControllerState::Active {
            goal,
            phase,
            degraded,
            degraded_ticks,
        } = &mut self.state
        else {
            return Err(ControlError::NoActiveGoal);
        };

        let now = state.simulation_time();

        let residual = match &*goal {
            Goal::JointPosition(goal) => joint_space_control(&self.config, goal, state)?,
            Goal::EePosition(goal) => {
                let (residual, singular) = operational_space_control(&self.config, goal, state)?;

                if singular {
                    *degraded_ticks += 1;
                    if *degraded {
                        trace!(time = now, "Task Jacobian still singular");
                    } else {
                        warn!(
                            time = now,
                            "Task Jacobian singular, dropping orientation control for this tick"
                        );
                    }
                } else if *degraded {
                    info!(time = now, "Task Jacobian regular again, orientation control restored");
                }
                *degraded = singular;

                residual
            },
        };

        let error = TrackingError::new(residual);
        let norm = error.norm();

        let started_at = match phase {
            Phase::Tracking(tracking) => tracking.started_at,
            Phase::AwaitingFirstEvaluation => {
                debug!(time = now, error = norm, "First evaluation of {}", goal);
                now
            },
        };
        *phase = Phase::Tracking(Tracking {
            error,
            started_at,
            last_eval: now,
        });

        trace!(time = now, error = norm, "Control update");
        Ok(norm)
    }

    /// 当前目标是否结束（收敛或超时）
    ///
    /// 纯查询，无副作用。跟踪误差未定义时总是 false。
    pub fn is_done(&self) -> bool {
        self.termination().is_some()
    }

    /// 结束原因，未结束时为 `None`
    pub fn termination(&self) -> Option<Termination> {
        let ControllerState::Active {
            goal,
            phase: Phase::Tracking(tracking),
            ..
        } = &self.state
        else {
            return None;
        };

        let threshold = goal.threshold().unwrap_or(self.config.threshold);
        if tracking.error.norm() < threshold {
            return Some(Termination::Converged);
        }

        let elapsed = Duration::try_from_secs_f64((tracking.last_eval - tracking.started_at).max(0.0))
            .unwrap_or(Duration::MAX);
        let timed_out = match goal.timeout() {
            Some(_) => goal.is_timed_out(elapsed),
            None => self
                .config
                .default_timeout()
                .is_some_and(|timeout| elapsed > timeout),
        };
        timed_out.then_some(Termination::TimedOut)
    }
}

/// 关节空间 PD 律
fn joint_space_control<S: StateProvider>(
    config: &ControllerConfig,
    goal: &JointPositionGoal,
    state: &mut S,
) -> Result<DVector<f64>, ControlError> {
    let dof = state.dof();
    if goal.dof() != dof {
        return Err(ControlError::InvalidGoalDimension {
            expected: dof,
            actual: goal.dof(),
        });
    }

    let error = goal.target() - state.joint_positions();
    let ddq = &error * config.gains.kp - state.joint_velocities() * config.gains.kd;

    state
        .set_joint_accelerations(&ddq)
        .map_err(ControlError::provider)?;
    Ok(error)
}

/// 操作空间 PD 律
///
/// 返回任务空间位置残差和本 tick 是否判定为奇异。
fn operational_space_control<S: StateProvider>(
    config: &ControllerConfig,
    goal: &EePositionGoal,
    state: &mut S,
) -> Result<(DVector<f64>, bool), ControlError> {
    let error: Vector3<f64> = goal.target() - state.ee_position();
    let ddx = error * config.gains.kp - state.ee_velocity() * config.gains.kd;

    let jacobian = state.ee_jacobian();
    let singular = state.is_singular(&jacobian, config.singular_tolerance);

    let command = if singular {
        DVector::from_column_slice(ddx.as_slice())
    } else {
        // e_ori = log(R · R_home⁻¹)，世界坐标系
        let orientation_error =
            (state.ee_orientation() * state.home_orientation().inverse()).scaled_axis();
        let omega: Vector3<f64> = jacobian.fixed_rows::<3>(3) * state.joint_velocities();
        let dw = -orientation_error * config.orientation.kp - omega * config.orientation.kd;

        DVector::from_iterator(6, ddx.iter().chain(dw.iter()).copied())
    };

    state
        .set_ee_acceleration(&command)
        .map_err(ControlError::provider)?;
    Ok((DVector::from_column_slice(error.as_slice()), singular))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PdGains;
    use crate::goal::EePositionGoal;

    fn controller() -> MotionController {
        MotionController::new(ControllerConfig::new(PdGains::new(49.0, 14.0))).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = MotionController::new(ControllerConfig::new(PdGains::new(-1.0, 0.0)));
        assert!(matches!(result, Err(ControlError::InvalidConfig(_))));
    }

    #[test]
    fn test_fresh_controller_not_done() {
        let controller = controller();
        assert_eq!(controller.status(), ControllerStatus::NoGoal);
        assert!(!controller.is_done());
        assert!(controller.goal().is_none());
        assert!(controller.tracking_error().is_none());
        assert_eq!(controller.termination(), None);
    }

    #[test]
    fn test_set_goal_awaits_first_evaluation() {
        let mut controller = controller();
        controller.set_goal(EePositionGoal::new(&[0.3, 0.0, 0.5]).unwrap());

        assert_eq!(controller.status(), ControllerStatus::AwaitingFirstEvaluation);
        assert!(!controller.is_done());
        assert!(controller.tracking_error().is_none());
        assert_eq!(controller.goal().map(Goal::kind), Some("ee_position"));
    }

    #[test]
    fn test_clear_goal() {
        let mut controller = controller();
        assert!(controller.clear_goal().is_none());

        controller.set_goal(EePositionGoal::new(&[0.3, 0.0, 0.5]).unwrap());
        let cleared = controller.clear_goal();
        assert!(matches!(cleared, Some(Goal::EePosition(_))));
        assert_eq!(controller.status(), ControllerStatus::NoGoal);
        assert_eq!(controller.degraded_ticks(), 0);
    }

    #[test]
    fn test_tracking_error_norm() {
        let error = TrackingError::new(DVector::from_column_slice(&[3.0, 4.0]));
        assert_eq!(error.norm(), 5.0);
        assert_eq!(error.residual().len(), 2);
    }
}
