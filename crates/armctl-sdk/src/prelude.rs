//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use armctl_sdk::prelude::*;
//! ```

// 控制层
pub use armctl_control::{
    ControllerConfig, ControllerStatus, EePositionGoal, Goal, JointPositionGoal,
    MotionController, PdGains, RunReport, StateProvider, Termination, TrackingError,
    run_to_convergence,
};

// 仿真层
pub use armctl_sim::{
    ArmModel, JsonLinesTelemetry, MemoryTelemetry, NullTelemetry, RobotSimulator,
    SimulatorConfig, Telemetry,
};

// 错误类型
pub use armctl_control::ControlError;
pub use armctl_sim::SimError;

// 数学类型
pub use nalgebra::{DVector, Vector3};
