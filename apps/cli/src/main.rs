//! # armctl CLI
//!
//! 在 Panda 仿真器上运行两阶段演示：先移动到关节目标，再用操作空间控制
//! 把末端移动到笛卡尔目标。
//!
//! ```bash
//! # 默认目标
//! armctl-cli --kp 49 --kd 14
//!
//! # 自定义目标 + 遥测输出
//! armctl-cli --kp 49 --kd 14 --ee=-0.45,-0.45,0.10 --telemetry run.jsonl
//!
//! # 从配置文件加载（命令行参数优先）
//! armctl-cli --kp 49 --kd 14 --config controller.toml --sim-config sim.toml
//! ```
//!
//! 两个目标都收敛时退出码为 0；目标超时或出现内部错误时非零。

use anyhow::Result;
use clap::Parser;

mod args;
mod demo;

use args::DemoArgs;

/// armctl CLI - 机械臂运动控制演示
#[derive(Parser, Debug)]
#[command(name = "armctl-cli")]
#[command(about = "Goal-driven arm motion control demo on a simulated Franka Panda", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    args: DemoArgs,

    /// 输出调试日志（`RUST_LOG` 优先）
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else {
        armctl_sdk::DEFAULT_LOG_FILTER
    };
    armctl_sdk::init_logger_with_filter(filter);

    demo::run(&cli.args)
}
