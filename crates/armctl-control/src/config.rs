//! 控制器配置
//!
//! PD 增益在控制器生命周期内保持不变，关节空间和任务空间控制律共用同一组。
//! 收敛阈值和超时是配置值，不按目标类型硬编码。
//!
//! # TOML 示例
//!
//! ```toml
//! threshold = 1e-3
//! default_timeout_s = 15.0
//! singular_tolerance = 0.01
//!
//! [gains]
//! kp = 49.0
//! kd = 14.0
//!
//! [orientation]
//! kp = 100.0
//! kd = 20.0
//! ```

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 默认收敛阈值（误差范数）
pub const DEFAULT_THRESHOLD: f64 = 1e-3;

/// 默认奇异判定容差
pub const DEFAULT_SINGULAR_TOLERANCE: f64 = 0.01;

/// PD 增益
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdGains {
    /// 比例增益
    pub kp: f64,
    /// 微分增益
    pub kd: f64,
}

impl PdGains {
    /// 创建 PD 增益
    pub const fn new(kp: f64, kd: f64) -> Self {
        Self { kp, kd }
    }

    /// 临界阻尼增益：`kd = 2 * sqrt(kp)`
    pub fn critically_damped(kp: f64) -> Self {
        Self {
            kp,
            kd: 2.0 * kp.sqrt(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ControlError> {
        if !self.kp.is_finite() || self.kp <= 0.0 {
            return Err(ControlError::InvalidConfig(format!(
                "{name}.kp must be finite and > 0, got {}",
                self.kp
            )));
        }
        if !self.kd.is_finite() || self.kd < 0.0 {
            return Err(ControlError::InvalidConfig(format!(
                "{name}.kd must be finite and >= 0, got {}",
                self.kd
            )));
        }
        Ok(())
    }
}

fn default_orientation_gains() -> PdGains {
    PdGains::new(100.0, 20.0)
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_singular_tolerance() -> f64 {
    DEFAULT_SINGULAR_TOLERANCE
}

/// 控制器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// 收敛阈值（误差范数）
    ///
    /// 目标自带阈值时以目标为准。
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// 默认超时（秒，仿真时间）
    ///
    /// `None` 表示目标未设置超时时永不超时。
    #[serde(default)]
    pub default_timeout_s: Option<f64>,

    /// 奇异判定容差
    #[serde(default = "default_singular_tolerance")]
    pub singular_tolerance: f64,

    /// 位置 PD 增益（关节空间 / 任务空间共用）
    pub gains: PdGains,

    /// 姿态 PD 增益（仅操作空间控制，非奇异时）
    #[serde(default = "default_orientation_gains")]
    pub orientation: PdGains,
}

impl ControllerConfig {
    /// 使用给定增益和默认值创建配置
    pub fn new(gains: PdGains) -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            default_timeout_s: None,
            singular_tolerance: DEFAULT_SINGULAR_TOLERANCE,
            gains,
            orientation: default_orientation_gains(),
        }
    }

    /// 设置收敛阈值
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// 设置默认超时
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_s = Some(timeout.as_secs_f64());
        self
    }

    /// 设置姿态增益
    pub fn with_orientation_gains(mut self, gains: PdGains) -> Self {
        self.orientation = gains;
        self
    }

    /// 设置奇异判定容差
    pub fn with_singular_tolerance(mut self, tolerance: f64) -> Self {
        self.singular_tolerance = tolerance;
        self
    }

    /// 默认超时
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_s
            .and_then(|timeout| Duration::try_from_secs_f64(timeout).ok())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ControlError> {
        self.gains.validate("gains")?;
        self.orientation.validate("orientation")?;

        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ControlError::InvalidConfig(format!(
                "threshold must be finite and > 0, got {}",
                self.threshold
            )));
        }
        if !self.singular_tolerance.is_finite() || self.singular_tolerance < 0.0 {
            return Err(ControlError::InvalidConfig(format!(
                "singular_tolerance must be finite and >= 0, got {}",
                self.singular_tolerance
            )));
        }
        if let Some(timeout) = self.default_timeout_s
            && (timeout <= 0.0 || Duration::try_from_secs_f64(timeout).is_err())
        {
            return Err(ControlError::InvalidConfig(format!(
                "default_timeout_s must be a representable duration > 0, got {timeout}"
            )));
        }
        Ok(())
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ControlError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ControlError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ControlError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ControlError> {
        toml::to_string_pretty(self).map_err(|e| ControlError::InvalidConfig(e.to_string()))
    }
}
