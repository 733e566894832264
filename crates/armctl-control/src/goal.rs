//! 运动目标
//!
//! 一个目标描述"去哪里"，构造后不可变。两种目标在结构上不同：
//!
//! - [`JointPositionGoal`]: 关节空间目标（维度 = 自由度数）
//! - [`EePositionGoal`]: 末端执行器笛卡尔位置目标（维度 = 3）
//!
//! 两者通过和类型 [`Goal`] 统一，控制律对其做穷尽匹配。
//! 替换目标意味着构造一个新值并整体安装，而不是修改旧值的字段。
//!
//! # 示例
//!
//! ```rust
//! use armctl_control::{EePositionGoal, Goal, JointPositionGoal};
//! use std::time::Duration;
//!
//! let joint = JointPositionGoal::new(&[-0.3, -0.8, -1.7, -1.7, -0.8, 1.8, -1.0], 7)?;
//! let ee = EePositionGoal::new(&[-0.45, -0.45, 0.10])?.with_timeout(Duration::from_secs(15));
//!
//! let goals: [Goal; 2] = [joint.into(), ee.into()];
//! assert_eq!(goals[0].dimension(), 7);
//! assert_eq!(goals[1].dimension(), 3);
//! # Ok::<(), armctl_control::ControlError>(())
//! ```

use crate::error::ControlError;
use nalgebra::{DVector, Vector3};
use std::fmt;
use std::time::Duration;

/// 笛卡尔位置目标的维度
pub const EE_POSITION_DIM: usize = 3;

/// 关节位置目标
#[derive(Debug, Clone, PartialEq)]
pub struct JointPositionGoal {
    target: DVector<f64>,
    threshold: Option<f64>,
    timeout: Option<Duration>,
}

impl JointPositionGoal {
    /// 创建关节位置目标
    ///
    /// # 错误
    ///
    /// - `target.len() != dof` → [`ControlError::InvalidGoalDimension`]
    /// - 任一分量非有限 → [`ControlError::InvalidGoalValue`]
    pub fn new(target: &[f64], dof: usize) -> Result<Self, ControlError> {
        check_target(target, dof)?;
        Ok(Self {
            target: DVector::from_column_slice(target),
            threshold: None,
            timeout: None,
        })
    }

    /// 目标关节位置（rad）
    pub fn target(&self) -> &DVector<f64> {
        &self.target
    }

    /// 自由度数
    pub fn dof(&self) -> usize {
        self.target.len()
    }
}

/// 末端执行器位置目标
///
/// 只指定位置；姿态由控制器调节到固定的 home 姿态，不由用户给定。
#[derive(Debug, Clone, PartialEq)]
pub struct EePositionGoal {
    target: Vector3<f64>,
    threshold: Option<f64>,
    timeout: Option<Duration>,
}

impl EePositionGoal {
    /// 创建末端位置目标（米，基座坐标系）
    ///
    /// # 错误
    ///
    /// - `target.len() != 3` → [`ControlError::InvalidGoalDimension`]
    /// - 任一分量非有限 → [`ControlError::InvalidGoalValue`]
    pub fn new(target: &[f64]) -> Result<Self, ControlError> {
        check_target(target, EE_POSITION_DIM)?;
        Ok(Self {
            target: Vector3::from_column_slice(target),
            threshold: None,
            timeout: None,
        })
    }

    /// 目标位置
    pub fn target(&self) -> &Vector3<f64> {
        &self.target
    }
}

fn check_target(target: &[f64], expected: usize) -> Result<(), ControlError> {
    if target.len() != expected {
        return Err(ControlError::InvalidGoalDimension {
            expected,
            actual: target.len(),
        });
    }
    if let Some((index, &value)) = target.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(ControlError::InvalidGoalValue { index, value });
    }
    Ok(())
}

// 两种目标共享的收敛阈值 / 超时构建方法
macro_rules! impl_goal_options {
    ($ty:ty) => {
        impl $ty {
            /// 覆盖控制器的收敛阈值（误差范数）
            ///
            /// 返回新值，原值不变。
            ///
            /// # 错误
            ///
            /// 阈值非有限或 `<= 0` → [`ControlError::InvalidGoalThreshold`]
            pub fn with_threshold(self, threshold: f64) -> Result<Self, ControlError> {
                if !threshold.is_finite() || threshold <= 0.0 {
                    return Err(ControlError::InvalidGoalThreshold(threshold));
                }
                Ok(Self {
                    threshold: Some(threshold),
                    ..self
                })
            }

            /// 设置超时（仿真时间，从目标首次求值开始计）
            pub fn with_timeout(self, timeout: Duration) -> Self {
                Self {
                    timeout: Some(timeout),
                    ..self
                }
            }

            /// 目标自带的收敛阈值
            pub fn threshold(&self) -> Option<f64> {
                self.threshold
            }

            /// 目标自带的超时
            pub fn timeout(&self) -> Option<Duration> {
                self.timeout
            }
        }
    };
}

impl_goal_options!(JointPositionGoal);
impl_goal_options!(EePositionGoal);

/// 运动目标（和类型）
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    /// 关节空间目标
    JointPosition(JointPositionGoal),
    /// 末端执行器位置目标（操作空间控制）
    EePosition(EePositionGoal),
}

impl Goal {
    /// 目标向量维度
    pub fn dimension(&self) -> usize {
        match self {
            Goal::JointPosition(goal) => goal.dof(),
            Goal::EePosition(_) => EE_POSITION_DIM,
        }
    }

    /// 目标自带的收敛阈值（未设置时使用控制器配置）
    pub fn threshold(&self) -> Option<f64> {
        match self {
            Goal::JointPosition(goal) => goal.threshold(),
            Goal::EePosition(goal) => goal.threshold(),
        }
    }

    /// 目标自带的超时
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Goal::JointPosition(goal) => goal.timeout(),
            Goal::EePosition(goal) => goal.timeout(),
        }
    }

    /// 目标类型名称（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            Goal::JointPosition(_) => "joint_position",
            Goal::EePosition(_) => "ee_position",
        }
    }

    /// 给定已经过的时间，目标是否超时
    ///
    /// 未设置超时的目标永远不会超时。
    pub fn is_timed_out(&self, elapsed: Duration) -> bool {
        self.timeout().is_some_and(|timeout| elapsed > timeout)
    }
}

impl From<JointPositionGoal> for Goal {
    fn from(goal: JointPositionGoal) -> Self {
        Goal::JointPosition(goal)
    }
}

impl From<EePositionGoal> for Goal {
    fn from(goal: EePositionGoal) -> Self {
        Goal::EePosition(goal)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target: &[f64] = match self {
            Goal::JointPosition(goal) => goal.target.as_slice(),
            Goal::EePosition(goal) => goal.target.as_slice(),
        };
        write!(f, "{} [", self.kind())?;
        for (i, v) in target.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.3}", v)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_goal_dimension_mismatch() {
        let err = JointPositionGoal::new(&[0.0; 6], 7).unwrap_err();
        assert!(matches!(
            err,
            ControlError::InvalidGoalDimension {
                expected: 7,
                actual: 6
            }
        ));

        let err = JointPositionGoal::new(&[0.0; 8], 7).unwrap_err();
        assert!(matches!(
            err,
            ControlError::InvalidGoalDimension {
                expected: 7,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_ee_goal_dimension_mismatch() {
        assert!(matches!(
            EePositionGoal::new(&[0.1, 0.2]),
            Err(ControlError::InvalidGoalDimension {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            EePositionGoal::new(&[0.1, 0.2, 0.3, 0.0, 0.0, 0.0]),
            Err(ControlError::InvalidGoalDimension {
                expected: 3,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_non_finite_target_rejected() {
        let err = EePositionGoal::new(&[0.1, f64::NAN, 0.3]).unwrap_err();
        assert!(matches!(err, ControlError::InvalidGoalValue { index: 1, .. }));

        let err = JointPositionGoal::new(&[0.0, 0.0, f64::INFINITY], 3).unwrap_err();
        assert!(matches!(err, ControlError::InvalidGoalValue { index: 2, .. }));
    }

    #[test]
    fn test_goal_accessors() {
        let goal = JointPositionGoal::new(&[0.1, 0.2, 0.3], 3).unwrap();
        assert_eq!(goal.target().as_slice(), &[0.1, 0.2, 0.3]);
        assert_eq!(goal.dof(), 3);
        assert_eq!(goal.threshold(), None);
        assert_eq!(goal.timeout(), None);

        let goal = EePositionGoal::new(&[-0.45, -0.45, 0.1]).unwrap();
        assert_eq!(goal.target(), &Vector3::new(-0.45, -0.45, 0.1));
    }

    #[test]
    fn test_builders_return_new_value() {
        let base = EePositionGoal::new(&[0.0, 0.0, 0.5]).unwrap();
        let tuned = base
            .clone()
            .with_threshold(1e-5)
            .unwrap()
            .with_timeout(Duration::from_secs(15));

        assert_eq!(base.threshold(), None);
        assert_eq!(tuned.threshold(), Some(1e-5));
        assert_eq!(tuned.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(tuned.target(), base.target());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        for threshold in [f64::NAN, f64::INFINITY, 0.0, -1e-3] {
            let result = JointPositionGoal::new(&[0.0; 7], 7)
                .unwrap()
                .with_threshold(threshold);
            assert!(
                matches!(result, Err(ControlError::InvalidGoalThreshold(_))),
                "threshold {threshold} must be rejected"
            );

            let result = EePositionGoal::new(&[0.0, 0.0, 0.5])
                .unwrap()
                .with_threshold(threshold);
            assert!(matches!(result, Err(ControlError::InvalidGoalThreshold(_))));
        }
    }

    #[test]
    fn test_goal_timeout_predicate() {
        let goal: Goal = JointPositionGoal::new(&[0.0; 7], 7).unwrap().into();
        assert!(!goal.is_timed_out(Duration::from_secs(3600)));

        let goal: Goal = JointPositionGoal::new(&[0.0; 7], 7)
            .unwrap()
            .with_timeout(Duration::from_secs(15))
            .into();
        assert!(!goal.is_timed_out(Duration::from_secs(15)));
        assert!(goal.is_timed_out(Duration::from_millis(15_001)));
    }

    #[test]
    fn test_goal_display() {
        let goal: Goal = EePositionGoal::new(&[-0.45, -0.45, 0.1]).unwrap().into();
        assert_eq!(goal.to_string(), "ee_position [-0.450, -0.450, 0.100]");
        assert_eq!(goal.dimension(), 3);
        assert_eq!(goal.kind(), "ee_position");
    }
}
