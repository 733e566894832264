//! 机械臂模型参数
//!
//! 串联转动关节机械臂，使用改进 DH 参数（Craig 约定）描述连杆几何：
//!
//! ```text
//! ⁱ⁻¹Tᵢ = Rx(αᵢ₋₁) · Tx(aᵢ₋₁) · Tz(dᵢ) · Rz(qᵢ)
//! ```
//!
//! 每个连杆附带质量、质心（连杆坐标系）和主惯量（质心处、与连杆坐标系对齐）。

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6, PI};

/// 标准重力加速度（m/s²）
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Panda 自由度
pub const PANDA_DOF: usize = 7;

/// Panda home 位形（rad）
pub const PANDA_HOME: [f64; PANDA_DOF] = [
    0.0,
    -FRAC_PI_6,
    0.0,
    -5.0 * FRAC_PI_6,
    0.0,
    2.0 * PI / 3.0,
    FRAC_PI_4,
];

/// Panda 末端执行器偏置（第 7 连杆坐标系，m）
pub const PANDA_EE_OFFSET: [f64; 3] = [0.0, 0.0, 0.214];

/// 改进 DH 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhParams {
    /// aᵢ₋₁（m）
    pub a: f64,
    /// dᵢ（m）
    pub d: f64,
    /// αᵢ₋₁（rad）
    pub alpha: f64,
}

impl DhParams {
    pub const fn new(a: f64, d: f64, alpha: f64) -> Self {
        Self { a, d, alpha }
    }

    /// 父连杆坐标系到本连杆坐标系的变换
    pub fn transform(&self, q: f64) -> Isometry3<f64> {
        let fixed = Isometry3::from_parts(
            Translation3::new(self.a, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.alpha),
        );
        let joint = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, self.d),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), q),
        );
        fixed * joint
    }
}

/// 连杆惯性参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertial {
    /// 质量（kg）
    pub mass: f64,
    /// 质心（连杆坐标系，m）
    pub com: Vector3<f64>,
    /// 主惯量（kg·m²）
    pub inertia: Vector3<f64>,
}

/// 连杆
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub name: String,
    pub dh: DhParams,
    pub inertial: Inertial,
}

/// 机械臂模型
#[derive(Debug, Clone, PartialEq)]
pub struct ArmModel {
    name: String,
    links: Vec<Link>,
    gravity: Vector3<f64>,
    home: Vec<f64>,
    ee_offset: Vector3<f64>,
}

impl ArmModel {
    /// 由连杆列表构造模型
    ///
    /// 重力默认为 `(0, 0, -9.81)`，home 位形默认为全零，末端偏置默认为零。
    pub fn new(name: impl Into<String>, links: Vec<Link>) -> Self {
        let dof = links.len();
        Self {
            name: name.into(),
            links,
            gravity: Vector3::new(0.0, 0.0, -STANDARD_GRAVITY),
            home: vec![0.0; dof],
            ee_offset: Vector3::zeros(),
        }
    }

    /// Franka Emika Panda
    ///
    /// 运动学取自官方 DH 表，惯性参数为公开文献中的辨识近似值。
    pub fn panda() -> Self {
        #[rustfmt::skip]
        const DH: [(f64, f64, f64); PANDA_DOF] = [
            (0.0,     0.333, 0.0),
            (0.0,     0.0,   -FRAC_PI_2),
            (0.0,     0.316, FRAC_PI_2),
            (0.0825,  0.0,   FRAC_PI_2),
            (-0.0825, 0.384, -FRAC_PI_2),
            (0.0,     0.0,   FRAC_PI_2),
            (0.088,   0.0,   FRAC_PI_2),
        ];
        #[rustfmt::skip]
        const INERTIAL: [(f64, [f64; 3], [f64; 3]); PANDA_DOF] = [
            (4.970684, [0.003875, 0.002081, -0.04762],   [0.70337, 0.70661, 0.009117]),
            (0.646926, [-0.003141, -0.02872, 0.003495],  [0.007962, 0.02811, 0.025995]),
            (3.228604, [0.027518, 0.039252, -0.066502],  [0.037242, 0.036155, 0.01083]),
            (3.587895, [-0.05317, 0.104419, 0.027454],   [0.025853, 0.019552, 0.028323]),
            (1.225946, [-0.011953, 0.041065, -0.038437], [0.035549, 0.029474, 0.008627]),
            (1.666555, [0.060149, -0.014117, -0.010517], [0.001964, 0.004354, 0.005433]),
            (1.465522, [0.010517, -0.004252, 0.061597],  [0.012516, 0.010027, 0.004815]),
        ];

        let links = DH
            .iter()
            .zip(INERTIAL.iter())
            .enumerate()
            .map(|(i, (&(a, d, alpha), &(mass, com, inertia)))| Link {
                name: format!("panda_link{}", i + 1),
                dh: DhParams::new(a, d, alpha),
                inertial: Inertial {
                    mass,
                    com: Vector3::from(com),
                    inertia: Vector3::from(inertia),
                },
            })
            .collect();

        Self::new("panda", links)
            .with_home(&PANDA_HOME)
            .with_ee_offset(Vector3::from(PANDA_EE_OFFSET))
    }

    /// 设置重力
    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// 设置 home 位形（长度必须等于自由度，否则忽略）
    pub fn with_home(mut self, home: &[f64]) -> Self {
        if home.len() == self.dof() {
            self.home = home.to_vec();
        } else {
            tracing::warn!(
                "Ignoring home configuration of length {} for {}-DOF model '{}'",
                home.len(),
                self.dof(),
                self.name
            );
        }
        self
    }

    /// 设置末端执行器偏置（最后一个连杆坐标系）
    pub fn with_ee_offset(mut self, offset: Vector3<f64>) -> Self {
        self.ee_offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 自由度
    pub fn dof(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn gravity(&self) -> &Vector3<f64> {
        &self.gravity
    }

    pub fn home(&self) -> &[f64] {
        &self.home
    }

    pub fn ee_offset(&self) -> &Vector3<f64> {
        &self.ee_offset
    }

    /// 总质量（kg）
    pub fn total_mass(&self) -> f64 {
        self.links.iter().map(|link| link.inertial.mass).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_panda_model() {
        let model = ArmModel::panda();
        assert_eq!(model.dof(), PANDA_DOF);
        assert_eq!(model.name(), "panda");
        assert_eq!(model.links()[0].name, "panda_link1");
        assert_eq!(model.home(), &PANDA_HOME);
        assert_relative_eq!(model.ee_offset().z, 0.214);
        assert_relative_eq!(model.gravity().z, -9.81);
        assert_relative_eq!(model.total_mass(), 16.792132, epsilon = 1e-9);
    }

    #[test]
    fn test_dh_transform() {
        let dh = DhParams::new(0.0825, 0.0, FRAC_PI_2);
        let iso = dh.transform(0.0);
        assert_relative_eq!(iso.translation.vector, Vector3::new(0.0825, 0.0, 0.0));
        // Rx(π/2) 把 z 轴转到 -y
        assert_relative_eq!(
            iso.rotation * Vector3::z(),
            Vector3::new(0.0, -1.0, 0.0),
            epsilon = 1e-12
        );

        let dh = DhParams::new(0.0, 0.333, 0.0);
        let iso = dh.transform(FRAC_PI_2);
        assert_relative_eq!(iso.translation.vector, Vector3::new(0.0, 0.0, 0.333));
        assert_relative_eq!(
            iso.rotation * Vector3::x(),
            Vector3::new(0.0, 1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_with_home_rejects_wrong_length() {
        let model = ArmModel::panda().with_home(&[0.0; 3]);
        assert_eq!(model.home(), &PANDA_HOME);
    }
}
