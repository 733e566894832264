//! 机械臂仿真器
//!
//! [`RobotSimulator`] 持有机械臂的完整状态，并实现 [`StateProvider`]：
//!
//! - 命令（关节加速度或末端加速度）在下发时立即映射为关节力矩，
//!   力矩在下一次 `step()` 中生效，并一直保持到下一条命令
//! - `step()` 求解正向动力学 `q̈ = M⁻¹(τ − b)`，再做半隐式欧拉积分
//! - 可选实时步进：每个 tick 休眠到下一个周期锚点
//!
//! # 示例
//!
//! ```rust,ignore
//! use armctl_sim::RobotSimulator;
//!
//! let mut sim = RobotSimulator::panda()?;
//! sim.add_object("goal", Vector3::new(-0.45, -0.45, 0.10));
//! ```

use crate::config::SimulatorConfig;
use crate::dynamics::{bias_torques, gravity_torques, mass_matrix};
use crate::error::SimError;
use crate::kinematics::Kinematics;
use crate::model::ArmModel;
use crate::opspace::{self, OperationalSpace};
use crate::telemetry::{NullTelemetry, Telemetry, TelemetryError};
use armctl_control::StateProvider;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn, Matrix6xX, UnitQuaternion, Vector3};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 位置任务维度
const POSITION_ROWS: usize = 3;

/// 位置 + 姿态任务维度
const POSE_ROWS: usize = 6;

/// 场景物体（只用于遥测显示）
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub position: Vector3<f64>,
}

/// 实时步进
#[derive(Debug)]
struct Pacer {
    period: Duration,
    next_tick: Instant,
    overruns: u64,
}

impl Pacer {
    fn new(period: Duration) -> Self {
        Self {
            period,
            next_tick: Instant::now(),
            overruns: 0,
        }
    }

    /// 休眠到下一个锚点
    fn wait(&mut self) {
        self.next_tick += self.period;
        let now = Instant::now();
        if self.next_tick > now {
            spin_sleep::sleep(self.next_tick - now);
        } else {
            self.overruns += 1;
            if self.overruns.is_power_of_two() {
                warn!(
                    overruns = self.overruns,
                    "Simulation step overran its {:?} period, resetting anchor", self.period
                );
            }
            // 重置锚点，避免累积延迟
            self.next_tick = now;
        }
    }
}

/// 机械臂仿真器
#[derive(Debug)]
pub struct RobotSimulator<T: Telemetry = NullTelemetry> {
    model: ArmModel,
    config: SimulatorConfig,
    ee_offset: Vector3<f64>,
    home: DVector<f64>,
    home_orientation: UnitQuaternion<f64>,

    q: DVector<f64>,
    dq: DVector<f64>,
    /// 当前施加的关节力矩（零阶保持）
    tau: DVector<f64>,
    kinematics: Kinematics,
    mass: DMatrix<f64>,
    ticks: u64,

    objects: Vec<SceneObject>,
    telemetry: T,
    telemetry_failures: u64,
    pacer: Option<Pacer>,
}

impl RobotSimulator<NullTelemetry> {
    /// 使用默认配置的 Panda 仿真器
    pub fn panda() -> Result<Self, SimError> {
        Self::new(ArmModel::panda(), SimulatorConfig::default())
    }

    /// 创建仿真器
    ///
    /// 初始状态为配置中的初始位置（缺省为 home 位形），速度为零，
    /// 初始力矩为重力补偿力矩。
    ///
    /// # 错误
    ///
    /// - 配置无效或模型没有连杆 → [`SimError::InvalidConfig`]
    /// - 初始位置维度与模型不符 → [`SimError::DimensionMismatch`]
    pub fn new(model: ArmModel, config: SimulatorConfig) -> Result<Self, SimError> {
        config.validate()?;

        let home = DVector::from_column_slice(model.home());
        let q = match &config.initial_positions {
            Some(q) => DVector::from_column_slice(q),
            None => home.clone(),
        };
        let ee_offset = config
            .ee_offset
            .map(Vector3::from)
            .unwrap_or(*model.ee_offset());

        let home_orientation = Kinematics::compute(&model, &home)?.last_frame().rotation;
        let kinematics = Kinematics::compute(&model, &q)?;
        let mass = mass_matrix(&model, &kinematics);
        let tau = gravity_torques(&model, &kinematics);
        let pacer = if config.realtime {
            Some(Pacer::new(config.timestep()?))
        } else {
            None
        };

        info!(
            model = model.name(),
            dof = model.dof(),
            timestep_s = config.timestep_s,
            realtime = config.realtime,
            "Simulator created"
        );

        Ok(Self {
            dq: DVector::zeros(model.dof()),
            model,
            config,
            ee_offset,
            home,
            home_orientation,
            q,
            tau,
            kinematics,
            mass,
            ticks: 0,
            objects: Vec::new(),
            telemetry: NullTelemetry,
            telemetry_failures: 0,
            pacer,
        })
    }
}

impl<T: Telemetry> RobotSimulator<T> {
    /// 替换遥测后端
    ///
    /// 会调用新后端的 `wait_until_ready()`，并立即发布当前状态和已添加的物体。
    pub fn with_telemetry<U: Telemetry>(self, telemetry: U) -> RobotSimulator<U> {
        let mut sim = RobotSimulator {
            model: self.model,
            config: self.config,
            ee_offset: self.ee_offset,
            home: self.home,
            home_orientation: self.home_orientation,
            q: self.q,
            dq: self.dq,
            tau: self.tau,
            kinematics: self.kinematics,
            mass: self.mass,
            ticks: self.ticks,
            objects: self.objects,
            telemetry,
            telemetry_failures: 0,
            pacer: self.pacer,
        };

        debug!("Waiting for telemetry backend");
        if let Err(e) = sim.telemetry.wait_until_ready() {
            sim.report_telemetry_failure(&e);
        }
        let objects = sim.objects.clone();
        for object in &objects {
            sim.publish_object(object);
        }
        sim.publish_state();
        sim
    }

    pub fn model(&self) -> &ArmModel {
        &self.model
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut T {
        &mut self.telemetry
    }

    /// 已执行的 tick 数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// home 位形
    pub fn home(&self) -> &DVector<f64> {
        &self.home
    }

    /// 当前施加的关节力矩
    pub fn joint_torques(&self) -> &DVector<f64> {
        &self.tau
    }

    /// 当前位形的正运动学
    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// 当前位形的质量矩阵
    pub fn mass_matrix(&self) -> &DMatrix<f64> {
        &self.mass
    }

    /// 场景物体
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// 添加场景物体（同名物体会被移动到新位置）
    pub fn add_object(&mut self, name: impl Into<String>, position: Vector3<f64>) {
        let object = SceneObject {
            name: name.into(),
            position,
        };
        debug!("Adding scene object '{}' at {:?}", object.name, position.as_slice());
        self.publish_object(&object);

        match self.objects.iter_mut().find(|o| o.name == object.name) {
            Some(existing) => *existing = object,
            None => self.objects.push(object),
        }
    }

    /// 直接设置关节状态（不经过动力学）
    ///
    /// 施加的力矩重置为新位形的重力补偿力矩。
    pub fn set_joint_state(
        &mut self,
        q: &DVector<f64>,
        dq: &DVector<f64>,
    ) -> Result<(), SimError> {
        SimError::check_len(self.model.dof(), q.len())?;
        SimError::check_len(self.model.dof(), dq.len())?;
        self.q = q.clone();
        self.dq = dq.clone();
        self.refresh()?;
        self.tau = gravity_torques(&self.model, &self.kinematics);
        Ok(())
    }

    /// 回到 home 位形并把仿真时间清零
    pub fn reset(&mut self) -> Result<(), SimError> {
        let home = self.home.clone();
        self.set_joint_state(&home, &DVector::zeros(self.model.dof()))?;
        self.ticks = 0;
        if let Some(pacer) = &mut self.pacer {
            pacer.next_tick = Instant::now();
        }
        info!("Simulator reset to home configuration");
        Ok(())
    }

    /// 位形改变后重新计算运动学和质量矩阵
    fn refresh(&mut self) -> Result<(), SimError> {
        self.kinematics = Kinematics::compute(&self.model, &self.q)?;
        self.mass = mass_matrix(&self.model, &self.kinematics);
        Ok(())
    }

    fn mass_cholesky(&self) -> Result<Cholesky<f64, Dyn>, SimError> {
        self.mass
            .clone()
            .cholesky()
            .ok_or_else(|| SimError::Numeric("mass matrix is not positive definite".to_string()))
    }

    /// 末端执行器雅可比（行数 `rows` = 3 或 6）
    fn task_jacobian(&self, rows: usize) -> DMatrix<f64> {
        let ee = self.kinematics.end_effector(&self.ee_offset);
        let jacobian = self.kinematics.jacobian(&ee, self.model.dof());
        DMatrix::from_fn(rows, self.model.dof(), |r, c| jacobian[(r, c)])
    }

    /// 零空间姿态加速度 `−kp·(q − q_home) − kv·q̇`
    fn posture_acceleration(&self) -> DVector<f64> {
        let gains = self.config.posture;
        (&self.q - &self.home) * -gains.kp - &self.dq * gains.kv
    }

    fn publish_object(&mut self, object: &SceneObject) {
        let key = format!("{}::position", object.name);
        if let Err(e) = self.telemetry.set(&key, object.position.as_slice()) {
            self.report_telemetry_failure(&e);
        }
    }

    fn publish_state(&mut self) {
        if let Err(e) = self.write_state() {
            self.report_telemetry_failure(&e);
        }
    }

    fn write_state(&mut self) -> Result<(), TelemetryError> {
        let name = self.model.name().to_string();
        let ee_position = self.ee_position();
        let ee_velocity = self.ee_velocity();

        self.telemetry.set("time", &[self.simulation_time()])?;
        self.telemetry
            .set(&format!("{name}::joint_positions"), self.q.as_slice())?;
        self.telemetry
            .set(&format!("{name}::joint_velocities"), self.dq.as_slice())?;
        self.telemetry
            .set(&format!("{name}::ee_position"), ee_position.as_slice())?;
        self.telemetry
            .set(&format!("{name}::ee_velocity"), ee_velocity.as_slice())?;
        self.telemetry.commit()
    }

    fn report_telemetry_failure(&mut self, error: &TelemetryError) {
        self.telemetry_failures += 1;
        if self.telemetry_failures == 1 {
            warn!("Telemetry failed, continuing without it: {}", error);
        } else {
            trace!(failures = self.telemetry_failures, "Telemetry failed: {}", error);
        }
    }
}

impl<T: Telemetry> StateProvider for RobotSimulator<T> {
    type Error = SimError;

    fn dof(&self) -> usize {
        self.model.dof()
    }

    fn joint_positions(&self) -> DVector<f64> {
        self.q.clone()
    }

    fn joint_velocities(&self) -> DVector<f64> {
        self.dq.clone()
    }

    fn ee_position(&self) -> Vector3<f64> {
        self.kinematics.end_effector(&self.ee_offset)
    }

    fn ee_velocity(&self) -> Vector3<f64> {
        self.ee_jacobian().fixed_rows::<3>(0) * &self.dq
    }

    fn ee_orientation(&self) -> UnitQuaternion<f64> {
        self.kinematics.last_frame().rotation
    }

    fn home_orientation(&self) -> UnitQuaternion<f64> {
        self.home_orientation
    }

    fn ee_jacobian(&self) -> Matrix6xX<f64> {
        let ee = self.ee_position();
        self.kinematics.jacobian(&ee, self.model.dof())
    }

    fn is_singular(&self, jacobian: &Matrix6xX<f64>, tolerance: f64) -> bool {
        let mass_inv = match self.mass_cholesky() {
            Ok(cholesky) => cholesky.inverse(),
            Err(e) => {
                warn!("Treating configuration as singular: {}", e);
                return true;
            },
        };
        let jacobian = DMatrix::from_column_slice(6, jacobian.ncols(), jacobian.as_slice());
        opspace::is_singular(&jacobian, &mass_inv, tolerance)
    }

    /// 逆动力学：`τ = M q̈ + b`
    fn set_joint_accelerations(&mut self, ddq: &DVector<f64>) -> Result<(), SimError> {
        SimError::check_len(self.model.dof(), ddq.len())?;
        if ddq.iter().any(|v| !v.is_finite()) {
            return Err(SimError::Numeric(
                "joint acceleration command is not finite".to_string(),
            ));
        }

        let bias = bias_torques(&self.model, &self.kinematics, &self.dq)?;
        self.tau = &self.mass * ddq + bias;
        Ok(())
    }

    /// 操作空间控制：`τ = Jᵀ Λ ẍ + Nᵀ M q̈₀ + g`
    fn set_ee_acceleration(&mut self, ddx: &DVector<f64>) -> Result<(), SimError> {
        let rows = ddx.len();
        if rows != POSITION_ROWS && rows != POSE_ROWS {
            return Err(SimError::DimensionMismatch {
                expected: POSE_ROWS,
                actual: rows,
            });
        }
        if ddx.iter().any(|v| !v.is_finite()) {
            return Err(SimError::Numeric(
                "end-effector acceleration command is not finite".to_string(),
            ));
        }

        let mass_inv = self.mass_cholesky()?.inverse();
        let os = OperationalSpace::new(self.task_jacobian(rows), &mass_inv)?;

        let task = os.task_torques(ddx)?;
        let posture = os.nullspace_torques(&self.mass, &self.posture_acceleration())?;
        let gravity = gravity_torques(&self.model, &self.kinematics);

        self.tau = task + posture + gravity;
        Ok(())
    }

    /// 正向动力学 + 半隐式欧拉积分
    fn step(&mut self) -> Result<(), SimError> {
        let dt = self.config.timestep_s;

        let bias = bias_torques(&self.model, &self.kinematics, &self.dq)?;
        let ddq = self.mass_cholesky()?.solve(&(&self.tau - bias));
        if ddq.iter().any(|v| !v.is_finite()) {
            return Err(SimError::Numeric(format!(
                "joint acceleration diverged at t = {:.3}s",
                self.simulation_time()
            )));
        }

        self.dq += ddq * dt;
        self.q += &self.dq * dt;
        self.ticks += 1;
        self.refresh()?;

        if self.ticks % self.config.telemetry_interval_ticks == 0 {
            self.publish_state();
        }
        if let Some(pacer) = &mut self.pacer {
            pacer.wait();
        }
        Ok(())
    }

    fn simulation_time(&self) -> f64 {
        self.ticks as f64 * self.config.timestep_s
    }
}
