//! 仿真器配置
//!
//! # TOML 示例
//!
//! ```toml
//! timestep_s = 0.001
//! realtime = false
//! telemetry_interval_ticks = 10
//!
//! [posture]
//! kp = 5.0
//! kv = 20.0
//! ```

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 默认时间步长（s）
pub const DEFAULT_TIMESTEP: f64 = 1e-3;

/// 零空间姿态保持增益
///
/// `q̈₀ = −kp·(q − q_home) − kv·q̇`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureGains {
    pub kp: f64,
    pub kv: f64,
}

impl Default for PostureGains {
    fn default() -> Self {
        Self { kp: 5.0, kv: 20.0 }
    }
}

fn default_timestep() -> f64 {
    DEFAULT_TIMESTEP
}

fn default_telemetry_interval() -> u64 {
    1
}

/// 仿真器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// 积分步长（s）
    #[serde(default = "default_timestep")]
    pub timestep_s: f64,

    /// 按墙钟时间步进（每个 tick 休眠到下一个周期）
    #[serde(default)]
    pub realtime: bool,

    /// 每隔多少个 tick 提交一次遥测
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_ticks: u64,

    /// 初始关节位置，缺省为模型的 home 位形
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_positions: Option<Vec<f64>>,

    /// 末端执行器偏置（最后一个连杆坐标系），缺省使用模型自带的偏置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ee_offset: Option<[f64; 3]>,

    /// 零空间姿态增益
    #[serde(default)]
    pub posture: PostureGains,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            timestep_s: DEFAULT_TIMESTEP,
            realtime: false,
            telemetry_interval_ticks: 1,
            initial_positions: None,
            ee_offset: None,
            posture: PostureGains::default(),
        }
    }
}

impl SimulatorConfig {
    /// 设置时间步长
    pub fn with_timestep(mut self, timestep: Duration) -> Self {
        self.timestep_s = timestep.as_secs_f64();
        self
    }

    /// 启用 / 禁用实时步进
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// 设置初始关节位置
    pub fn with_initial_positions(mut self, q: &[f64]) -> Self {
        self.initial_positions = Some(q.to_vec());
        self
    }

    /// 设置遥测提交间隔
    pub fn with_telemetry_interval(mut self, ticks: u64) -> Self {
        self.telemetry_interval_ticks = ticks;
        self
    }

    /// 时间步长
    ///
    /// # 错误
    ///
    /// `timestep_s` 不是可表示的正时长 → [`SimError::InvalidConfig`]
    pub fn timestep(&self) -> Result<Duration, SimError> {
        match Duration::try_from_secs_f64(self.timestep_s) {
            Ok(timestep) if self.timestep_s > 0.0 => Ok(timestep),
            _ => Err(SimError::InvalidConfig(format!(
                "timestep_s must be a representable duration > 0, got {}",
                self.timestep_s
            ))),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), SimError> {
        self.timestep()?;
        if self.telemetry_interval_ticks == 0 {
            return Err(SimError::InvalidConfig(
                "telemetry_interval_ticks must be >= 1".to_string(),
            ));
        }
        if !self.posture.kp.is_finite() || !self.posture.kv.is_finite() {
            return Err(SimError::InvalidConfig(format!(
                "posture gains must be finite, got kp={} kv={}",
                self.posture.kp, self.posture.kv
            )));
        }
        if let Some(q) = &self.initial_positions
            && q.iter().any(|v| !v.is_finite())
        {
            return Err(SimError::InvalidConfig(
                "initial_positions must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, SimError> {
        let config: Self =
            toml::from_str(content).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, SimError> {
        toml::to_string_pretty(self).map_err(|e| SimError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulatorConfig::default();
        assert_eq!(config.timestep().unwrap(), Duration::from_millis(1));
        assert!(!config.realtime);
        assert_eq!(config.posture, PostureGains { kp: 5.0, kv: 20.0 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = SimulatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulatorConfig::default());
    }

    #[test]
    fn test_from_toml() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            timestep_s = 0.002
            realtime = true
            initial_positions = [0.0, 0.0, 0.0, -1.5, 0.0, 1.5, 0.0]
            ee_offset = [0.0, 0.0, 0.1]

            [posture]
            kp = 2.0
            kv = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.timestep().unwrap(), Duration::from_millis(2));
        assert!(config.realtime);
        assert_eq!(config.initial_positions.as_ref().map(Vec::len), Some(7));
        assert_eq!(config.ee_offset, Some([0.0, 0.0, 0.1]));
        assert_eq!(config.posture.kv, 10.0);
    }

    #[test]
    fn test_validate() {
        assert!(SimulatorConfig::from_toml_str("timestep_s = 0.0").is_err());
        for timestep in ["1e20", "-0.001", "inf", "nan"] {
            assert!(
                matches!(
                    SimulatorConfig::from_toml_str(&format!("timestep_s = {timestep}")),
                    Err(SimError::InvalidConfig(_))
                ),
                "timestep_s = {timestep} must be rejected"
            );
        }
        assert!(SimulatorConfig::from_toml_str("telemetry_interval_ticks = 0").is_err());
        let config = SimulatorConfig::default().with_initial_positions(&[f64::NAN]);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let config = SimulatorConfig::default()
            .with_realtime(true)
            .with_initial_positions(&[0.1; 7])
            .with_telemetry_interval(5);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(SimulatorConfig::load_from_file(&path).unwrap(), config);
    }
}
