//! 命令行参数
//!
//! 配置文件提供基线，命令行参数覆盖对应字段。

use anyhow::{Context, Result};
use armctl_sdk::prelude::*;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// 默认关节目标（rad）
pub const DEFAULT_JOINT_TARGET: [f64; 7] = [-0.3, -0.8, -1.7, -1.7, -0.8, 1.8, -1.0];

/// 默认末端目标（m）
pub const DEFAULT_EE_TARGET: [f64; 3] = [-0.45, -0.45, 0.10];

/// 演示参数
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// 比例增益
    #[arg(long)]
    pub kp: f64,

    /// 微分增益
    #[arg(long)]
    pub kd: f64,

    /// 控制器配置文件（TOML）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 仿真器配置文件（TOML）
    #[arg(long)]
    pub sim_config: Option<PathBuf>,

    /// 收敛阈值（覆盖配置）
    #[arg(long)]
    pub threshold: Option<f64>,

    /// 每个目标的超时（秒，仿真时间）
    #[arg(long)]
    pub timeout: Option<f64>,

    /// 关节目标（rad），逗号分隔
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = DEFAULT_JOINT_TARGET
    )]
    pub joints: Vec<f64>,

    /// 末端目标（m），逗号分隔
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = DEFAULT_EE_TARGET
    )]
    pub ee: Vec<f64>,

    /// 遥测输出文件（JSON Lines）
    #[arg(long)]
    pub telemetry: Option<PathBuf>,

    /// 按墙钟时间步进
    #[arg(long)]
    pub realtime: bool,
}

impl DemoArgs {
    /// 合并配置文件和命令行参数得到控制器配置
    pub fn controller_config(&self) -> Result<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => ControllerConfig::load_from_file(path)
                .with_context(|| format!("加载控制器配置失败: {}", path.display()))?,
            None => ControllerConfig::new(PdGains::new(self.kp, self.kd)),
        };

        config.gains = PdGains::new(self.kp, self.kd);
        if let Some(threshold) = self.threshold {
            config = config.with_threshold(threshold);
        }
        if let Some(timeout) = self.timeout {
            let timeout = Duration::try_from_secs_f64(timeout)
                .with_context(|| format!("无效的超时: {timeout}"))?;
            config = config.with_default_timeout(timeout);
        }

        config.validate().context("控制器配置无效")?;
        Ok(config)
    }

    /// 合并配置文件和命令行参数得到仿真器配置
    pub fn simulator_config(&self) -> Result<SimulatorConfig> {
        let config = match &self.sim_config {
            Some(path) => SimulatorConfig::load_from_file(path)
                .with_context(|| format!("加载仿真器配置失败: {}", path.display()))?,
            None => SimulatorConfig::default(),
        };

        let realtime = config.realtime || self.realtime;
        Ok(config.with_realtime(realtime))
    }
}
