//! Mock 状态提供者
//!
//! 无网络、无动力学引擎的假机械臂：每个关节是一个双积分器，
//! 末端运动学为常数雅可比的线性映射。
//!
//! - 关节 0..3 直接映射到末端位置 x/y/z
//! - 关节 3..6 直接映射到末端姿态（旋转向量），home 姿态为单位旋转
//! - 关节 6 不影响末端（冗余自由度）
//!
//! 雅可比各行正交归一，因此 `q̈ = Jᵀ ẍ` 恰好实现期望的末端加速度。

use armctl_control::StateProvider;
use nalgebra::{DVector, Matrix6xX, UnitQuaternion, Vector3};
use thiserror::Error;

/// Mock 自由度
pub const MOCK_DOF: usize = 7;

/// Mock 时间步长（s）
pub const MOCK_DT: f64 = 1e-3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MockError {
    #[error("command dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("injected numeric failure")]
    Injected,
}

/// 假机械臂
#[derive(Debug, Clone)]
pub struct MockArm {
    pub q: DVector<f64>,
    pub dq: DVector<f64>,
    pub ddq: DVector<f64>,
    pub ee_origin: Vector3<f64>,
    pub jacobian: Matrix6xX<f64>,
    /// `is_singular()` 的返回值
    pub singular: bool,
    /// 下一次命令下发失败
    pub fail_next_command: bool,
    pub joint_commands: Vec<DVector<f64>>,
    pub ee_commands: Vec<DVector<f64>>,
    pub ticks: u64,
}

impl MockArm {
    pub fn new() -> Self {
        let mut jacobian = Matrix6xX::zeros(MOCK_DOF);
        for i in 0..6 {
            jacobian[(i, i)] = 1.0;
        }
        Self {
            q: DVector::zeros(MOCK_DOF),
            dq: DVector::zeros(MOCK_DOF),
            ddq: DVector::zeros(MOCK_DOF),
            ee_origin: Vector3::new(0.3, 0.0, 0.5),
            jacobian,
            singular: false,
            fail_next_command: false,
            joint_commands: Vec::new(),
            ee_commands: Vec::new(),
            ticks: 0,
        }
    }

    pub fn with_positions(mut self, q: &[f64]) -> Self {
        self.q = DVector::from_column_slice(q);
        self
    }

    pub fn with_velocities(mut self, dq: &[f64]) -> Self {
        self.dq = DVector::from_column_slice(dq);
        self
    }

    pub fn singular(mut self, singular: bool) -> Self {
        self.singular = singular;
        self
    }

    pub fn last_joint_command(&self) -> Option<&DVector<f64>> {
        self.joint_commands.last()
    }

    pub fn last_ee_command(&self) -> Option<&DVector<f64>> {
        self.ee_commands.last()
    }

    pub fn command_count(&self) -> usize {
        self.joint_commands.len() + self.ee_commands.len()
    }

    fn take_failure(&mut self) -> Result<(), MockError> {
        if std::mem::take(&mut self.fail_next_command) {
            return Err(MockError::Injected);
        }
        Ok(())
    }
}

impl Default for MockArm {
    fn default() -> Self {
        Self::new()
    }
}

impl StateProvider for MockArm {
    type Error = MockError;

    fn dof(&self) -> usize {
        MOCK_DOF
    }

    fn joint_positions(&self) -> DVector<f64> {
        self.q.clone()
    }

    fn joint_velocities(&self) -> DVector<f64> {
        self.dq.clone()
    }

    fn ee_position(&self) -> Vector3<f64> {
        self.ee_origin + self.jacobian.fixed_rows::<3>(0) * &self.q
    }

    fn ee_velocity(&self) -> Vector3<f64> {
        self.jacobian.fixed_rows::<3>(0) * &self.dq
    }

    fn ee_orientation(&self) -> UnitQuaternion<f64> {
        let rotation: Vector3<f64> = self.jacobian.fixed_rows::<3>(3) * &self.q;
        UnitQuaternion::from_scaled_axis(rotation)
    }

    fn home_orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::identity()
    }

    fn ee_jacobian(&self) -> Matrix6xX<f64> {
        self.jacobian.clone()
    }

    fn is_singular(&self, _jacobian: &Matrix6xX<f64>, _tolerance: f64) -> bool {
        self.singular
    }

    fn set_joint_accelerations(&mut self, ddq: &DVector<f64>) -> Result<(), Self::Error> {
        self.take_failure()?;
        if ddq.len() != MOCK_DOF {
            return Err(MockError::DimensionMismatch {
                expected: MOCK_DOF,
                actual: ddq.len(),
            });
        }
        self.ddq = ddq.clone();
        self.joint_commands.push(ddq.clone());
        Ok(())
    }

    fn set_ee_acceleration(&mut self, ddx: &DVector<f64>) -> Result<(), Self::Error> {
        self.take_failure()?;
        let rows = ddx.len();
        if rows != 3 && rows != 6 {
            return Err(MockError::DimensionMismatch {
                expected: 6,
                actual: rows,
            });
        }
        self.ddq = self.jacobian.rows(0, rows).transpose() * ddx;
        self.ee_commands.push(ddx.clone());
        Ok(())
    }

    fn step(&mut self) -> Result<(), Self::Error> {
        self.dq += &self.ddq * MOCK_DT;
        self.q += &self.dq * MOCK_DT;
        self.ticks += 1;
        Ok(())
    }

    fn simulation_time(&self) -> f64 {
        self.ticks as f64 * MOCK_DT
    }
}
