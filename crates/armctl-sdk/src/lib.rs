//! armctl SDK - 机械臂目标驱动运动控制
//!
//! 本 SDK 采用分层架构：
//!
//! - **控制层** (`control`): 目标、PD 控制器、控制循环，不依赖具体动力学引擎
//! - **仿真层** (`sim`): Panda 刚体模型、操作空间映射、积分器、遥测
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use armctl_sdk::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! armctl_sdk::init_logger();
//!
//! let mut sim = RobotSimulator::panda()?;
//! let mut controller = MotionController::new(ControllerConfig::new(PdGains::new(49.0, 14.0)))?;
//!
//! controller.set_goal(JointPositionGoal::new(&[-0.3, -0.8, -1.7, -1.7, -0.8, 1.8, -1.0], 7)?);
//! run_to_convergence(&mut controller, &mut sim)?;
//!
//! controller.set_goal(EePositionGoal::new(&[-0.45, -0.45, 0.10])?);
//! let report = run_to_convergence(&mut controller, &mut sim)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub use armctl_control as control;
pub use armctl_sim as sim;

// Prelude 模块
pub mod prelude;

mod logging;

pub use logging::{DEFAULT_LOG_FILTER, init_logger, init_logger_with_filter};

// 控制层常用类型
pub use armctl_control::{
    ControlError, ControllerConfig, EePositionGoal, Goal, JointPositionGoal, MotionController,
    PdGains, RunReport, StateProvider, Termination, run_to_convergence,
};

// 仿真层常用类型
pub use armctl_sim::{RobotSimulator, SimError, SimulatorConfig};
