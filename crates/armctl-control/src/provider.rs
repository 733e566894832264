//! 状态提供者接口
//!
//! 控制器通过此 trait 读取运动学/动力学状态并下发命令，
//! 不直接修改仿真状态：命令由提供者在自己的 `step()` 中生效。
//!
//! # 坐标约定
//!
//! - 关节向量维度 = [`dof()`](StateProvider::dof)
//! - 雅可比为 6 × dof，前 3 行为线速度，后 3 行为角速度，在末端执行器偏置点处求值
//! - 位置单位米，角度单位弧度，时间单位秒
//!
//! # 错误
//!
//! 只有下发命令和步进会失败（数值分解失败、维度不匹配等）。
//! 控制器不会恢复这些错误，而是通过 [`ControlError::Provider`](crate::ControlError::Provider) 原样向上传播。

use nalgebra::{DVector, Matrix6xX, UnitQuaternion, Vector3};

/// 运动学 / 动力学状态提供者
///
/// 控制器和控制循环只在单线程中顺序访问提供者，因此不要求 `Send` 或 `Sync`。
pub trait StateProvider {
    /// 提供者错误类型
    type Error: std::error::Error + Send + Sync + 'static;

    /// 自由度数
    fn dof(&self) -> usize;

    /// 当前关节位置（rad）
    fn joint_positions(&self) -> DVector<f64>;

    /// 当前关节速度（rad/s）
    fn joint_velocities(&self) -> DVector<f64>;

    /// 末端执行器位置（m）
    fn ee_position(&self) -> Vector3<f64>;

    /// 末端执行器线速度（m/s）
    fn ee_velocity(&self) -> Vector3<f64>;

    /// 末端执行器姿态
    fn ee_orientation(&self) -> UnitQuaternion<f64>;

    /// 固定的 home 姿态（操作空间控制的姿态目标）
    fn home_orientation(&self) -> UnitQuaternion<f64>;

    /// 末端执行器雅可比（6 × dof）
    fn ee_jacobian(&self) -> Matrix6xX<f64>;

    /// 判断任务雅可比是否奇异
    fn is_singular(&self, jacobian: &Matrix6xX<f64>, tolerance: f64) -> bool;

    /// 下发关节加速度命令（内部经逆动力学映射为力矩）
    fn set_joint_accelerations(&mut self, ddq: &DVector<f64>) -> Result<(), Self::Error>;

    /// 下发末端加速度命令
    ///
    /// `ddx` 为 3 维（仅位置）或 6 维（位置 + 姿态）。提供者负责操作空间投影、
    /// 零空间姿态控制和重力补偿。
    fn set_ee_acceleration(&mut self, ddx: &DVector<f64>) -> Result<(), Self::Error>;

    /// 推进一个时间步
    fn step(&mut self) -> Result<(), Self::Error>;

    /// 当前仿真时间（s）
    fn simulation_time(&self) -> f64;
}
