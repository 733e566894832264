//! 控制层错误类型定义
//!
//! # 错误分类
//!
//! - **契约违反**: `InvalidGoalDimension`、`InvalidGoalValue`、`InvalidGoalThreshold`、`NoActiveGoal`，调用方需要修正输入
//! - **配置错误**: `InvalidConfig`，通常在启动阶段暴露
//! - **状态提供者错误**: `Provider`，动力学引擎的数值/运动学错误，原样透传（作为 `source`）
//!
//! 奇异位形降级和超时未收敛都**不是**错误：前者只记录日志，后者通过
//! [`Termination::TimedOut`](crate::Termination) 报告。

use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 目标向量维度与目标类型不匹配
    #[error("Invalid goal dimension: expected {expected}, got {actual}")]
    InvalidGoalDimension {
        /// 期望维度（关节目标为自由度数，末端目标为 3）
        expected: usize,
        /// 实际维度
        actual: usize,
    },

    /// 目标向量包含非有限值（NaN / Inf）
    #[error("Invalid goal value at index {index}: {value}")]
    InvalidGoalValue {
        /// 分量索引
        index: usize,
        /// 非法值
        value: f64,
    },

    /// 目标自带的收敛阈值非有限或不为正
    #[error("Invalid goal threshold: {0} (must be finite and > 0)")]
    InvalidGoalThreshold(f64),

    /// 没有激活的目标时调用了 `update_control()`
    #[error("No active goal: call set_goal() before update_control()")]
    NoActiveGoal,

    /// 配置无效
    #[error("Invalid controller config: {0}")]
    InvalidConfig(String),

    /// 状态提供者（动力学引擎）错误
    #[error("State provider error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ControlError {
    /// 包装状态提供者错误（保留原始错误作为 `source`）
    pub fn provider<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ControlError::Provider(Box::new(err))
    }

    /// 是否为调用方契约违反（编程错误，不应重试）
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ControlError::InvalidGoalDimension { .. }
                | ControlError::InvalidGoalValue { .. }
                | ControlError::InvalidGoalThreshold(_)
                | ControlError::NoActiveGoal
        )
    }
}
