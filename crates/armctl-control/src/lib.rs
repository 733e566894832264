//! # armctl-control
//!
//! 多关节机械臂的目标驱动运动控制核心：
//!
//! - **目标** ([`goal`]): 关节位置目标 / 末端位置目标（和类型，构造后不可变）
//! - **控制器** ([`controller`]): 关节空间 PD 与操作空间 PD（含奇异降级、姿态调节）
//! - **控制循环** ([`loop_runner`]): tick 驱动直到收敛或超时
//! - **状态提供者** ([`provider`]): 动力学引擎的窄接口
//!
//! 本 crate 不依赖任何具体的动力学引擎；仿真实现见 `armctl-sim`。
//!
//! # 数据流
//!
//! ```text
//! run_to_convergence ─▶ update_control() ─▶ StateProvider (读状态 / 下发命令)
//!         │                                          │
//!         └──────────── step() ◀─────────────────────┘
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod goal;
pub mod loop_runner;
pub mod provider;

// 重新导出常用类型
pub use config::{ControllerConfig, PdGains};
pub use controller::{ControllerStatus, MotionController, Termination, TrackingError};
pub use error::ControlError;
pub use goal::{EePositionGoal, Goal, JointPositionGoal};
pub use loop_runner::{RunReport, run_to_convergence};
pub use provider::StateProvider;
