//! # armctl-sim
//!
//! 7 自由度机械臂的刚体仿真器，实现 [`armctl_control::StateProvider`]：
//!
//! - **模型** ([`model`]): 改进 DH 运动学参数 + 连杆惯性参数（内置 Franka Panda）
//! - **运动学** ([`kinematics`]): 正运动学、几何雅可比
//! - **动力学** ([`dynamics`]): 质量矩阵、递归牛顿-欧拉逆动力学
//! - **操作空间** ([`opspace`]): 任务空间惯量、奇异判定、动态一致零空间投影
//! - **仿真器** ([`simulator`]): 力矩级正向动力学积分，命令映射，实时步进
//! - **遥测** ([`telemetry`]): 状态快照发布（内存 / JSON Lines）
//!
//! # 示例
//!
//! ```rust,no_run
//! use armctl_control::{ControllerConfig, JointPositionGoal, MotionController, PdGains};
//! use armctl_sim::RobotSimulator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sim = RobotSimulator::panda()?;
//! let mut controller = MotionController::new(ControllerConfig::new(PdGains::new(49.0, 14.0)))?;
//! controller.set_goal(JointPositionGoal::new(&[-0.3, -0.8, -1.7, -1.7, -0.8, 1.8, -1.0], 7)?);
//! let report = armctl_control::run_to_convergence(&mut controller, &mut sim)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dynamics;
pub mod error;
pub mod kinematics;
pub mod model;
pub mod opspace;
pub mod simulator;
pub mod telemetry;

// 重新导出常用类型
pub use config::{PostureGains, SimulatorConfig};
pub use error::SimError;
pub use kinematics::Kinematics;
pub use model::{ArmModel, DhParams, Inertial, Link, PANDA_DOF, PANDA_HOME};
pub use opspace::OperationalSpace;
pub use simulator::{RobotSimulator, SceneObject};
pub use telemetry::{
    JsonLinesTelemetry, MemoryTelemetry, NullTelemetry, Telemetry, TelemetryError,
    TelemetryFrame,
};
