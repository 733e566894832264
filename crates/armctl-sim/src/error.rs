//! 仿真层错误类型定义

use thiserror::Error;

/// 仿真层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// 向量 / 命令维度不匹配
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// 期望维度
        expected: usize,
        /// 实际维度
        actual: usize,
    },

    /// 数值计算失败（质量矩阵分解、伪逆、状态含 NaN 等）
    #[error("Numeric failure: {0}")]
    Numeric(String),

    /// 配置无效
    #[error("Invalid simulator config: {0}")]
    InvalidConfig(String),
}

impl SimError {
    /// 检查向量长度
    pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), SimError> {
        if expected != actual {
            return Err(SimError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }
}
