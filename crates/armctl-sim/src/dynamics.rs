//! 刚体动力学
//!
//! - [`mass_matrix`]: 复合质量矩阵 `M(q) = Σ mᵢ Jᵥᵢᵀ Jᵥᵢ + Jωᵢᵀ Iᵢ Jωᵢ`
//! - [`rnea`]: 递归牛顿-欧拉逆动力学 `τ = M q̈ + C(q, q̇) q̇ + g(q)`
//!
//! 所有量在世界系中计算。重力通过给基座施加 `-g` 的加速度引入。

use crate::error::SimError;
use crate::kinematics::Kinematics;
use crate::model::ArmModel;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

/// 连杆 i 在世界系中关于质心的惯量张量
fn world_inertia(model: &ArmModel, kin: &Kinematics, i: usize) -> Matrix3<f64> {
    let rotation = kin.rotation(i);
    rotation * Matrix3::from_diagonal(&model.links()[i].inertial.inertia) * rotation.transpose()
}

/// 关节空间质量矩阵（对称正定）
pub fn mass_matrix(model: &ArmModel, kin: &Kinematics) -> DMatrix<f64> {
    let dof = model.dof();
    let mut mass = DMatrix::zeros(dof, dof);

    for (i, link) in model.links().iter().enumerate() {
        let com = kin.point_in_world(i, &link.inertial.com);
        let jacobian = kin.jacobian(&com, i + 1);
        let jv = jacobian.fixed_rows::<3>(0).into_owned();
        let jw = jacobian.fixed_rows::<3>(3).into_owned();
        let inertia = world_inertia(model, kin, i);

        mass += jv.transpose() * &jv * link.inertial.mass;
        mass += jw.transpose() * inertia * &jw;
    }

    mass
}

/// 递归牛顿-欧拉逆动力学
///
/// # 参数
///
/// - `dq`: 关节速度
/// - `ddq`: 关节加速度
/// - `with_gravity`: 是否计入重力
///
/// # 返回
///
/// 产生给定运动所需的关节力矩。
///
/// # 错误
///
/// `dq` 或 `ddq` 长度与自由度不一致时返回 [`SimError::DimensionMismatch`]。
pub fn rnea(
    model: &ArmModel,
    kin: &Kinematics,
    dq: &DVector<f64>,
    ddq: &DVector<f64>,
    with_gravity: bool,
) -> Result<DVector<f64>, SimError> {
    SimError::check_len(model.dof(), dq.len())?;
    SimError::check_len(model.dof(), ddq.len())?;
    Ok(rnea_unchecked(model, kin, dq, ddq, with_gravity))
}

fn rnea_unchecked(
    model: &ArmModel,
    kin: &Kinematics,
    dq: &DVector<f64>,
    ddq: &DVector<f64>,
    with_gravity: bool,
) -> DVector<f64> {
    let dof = model.dof();

    struct LinkWrench {
        origin: Vector3<f64>,
        com_offset: Vector3<f64>,
        axis: Vector3<f64>,
        force: Vector3<f64>,
        moment: Vector3<f64>,
    }

    // 前向递推：速度、加速度和惯性力
    let mut omega = Vector3::zeros();
    let mut alpha = Vector3::zeros();
    let mut accel = if with_gravity {
        -model.gravity()
    } else {
        Vector3::zeros()
    };
    let mut previous_origin = Vector3::zeros();
    let mut wrenches = Vec::with_capacity(dof);

    for (i, link) in model.links().iter().enumerate() {
        let origin = kin.origin(i);
        let axis = kin.axis(i);

        let r = origin - previous_origin;
        accel += alpha.cross(&r) + omega.cross(&omega.cross(&r));

        let joint_rate = axis * dq[i];
        let omega_prev = omega;
        omega = omega_prev + joint_rate;
        alpha += axis * ddq[i] + omega_prev.cross(&joint_rate);

        let com_offset = kin.rotation(i) * link.inertial.com;
        let com_accel = accel + alpha.cross(&com_offset) + omega.cross(&omega.cross(&com_offset));
        let inertia = world_inertia(model, kin, i);

        wrenches.push(LinkWrench {
            origin,
            com_offset,
            axis,
            force: com_accel * link.inertial.mass,
            moment: inertia * alpha + omega.cross(&(inertia * omega)),
        });
        previous_origin = origin;
    }

    // 反向递推：关节处的力 / 力矩
    let mut tau = DVector::zeros(dof);
    let mut force = Vector3::zeros();
    let mut moment = Vector3::zeros();
    let mut child_origin: Option<Vector3<f64>> = None;

    for (i, wrench) in wrenches.iter().enumerate().rev() {
        let mut n = wrench.moment + moment + wrench.com_offset.cross(&wrench.force);
        if let Some(child) = child_origin {
            n += (child - wrench.origin).cross(&force);
        }
        force += wrench.force;
        moment = n;
        child_origin = Some(wrench.origin);
        tau[i] = moment.dot(&wrench.axis);
    }

    tau
}

/// 重力补偿力矩 `g(q)`
pub fn gravity_torques(model: &ArmModel, kin: &Kinematics) -> DVector<f64> {
    let zeros = DVector::zeros(model.dof());
    rnea_unchecked(model, kin, &zeros, &zeros, true)
}

/// 偏置力矩 `b = C(q, q̇) q̇ + g(q)`
pub fn bias_torques(
    model: &ArmModel,
    kin: &Kinematics,
    dq: &DVector<f64>,
) -> Result<DVector<f64>, SimError> {
    rnea(model, kin, dq, &DVector::zeros(model.dof()), true)
}
