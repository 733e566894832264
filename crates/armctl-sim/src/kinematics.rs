//! 正运动学与几何雅可比
//!
//! [`Kinematics`] 是某一关节位形下所有连杆坐标系（世界系）的快照。
//! 动力学和操作空间计算都基于同一份快照，位形改变后需要重新计算。

use crate::error::SimError;
use crate::model::ArmModel;
use nalgebra::{DVector, Isometry3, Matrix3, Matrix6xX, Point3, Vector3};

/// 正运动学快照
#[derive(Debug, Clone, PartialEq)]
pub struct Kinematics {
    /// 连杆 i 在世界系中的位姿（`frames[i]` 的 z 轴为关节 i 的转轴）
    frames: Vec<Isometry3<f64>>,
}

impl Kinematics {
    /// 计算所有连杆坐标系
    ///
    /// # 错误
    ///
    /// - 模型没有连杆 → [`SimError::InvalidConfig`]
    /// - `q` 长度与自由度不一致 → [`SimError::DimensionMismatch`]
    pub fn compute(model: &ArmModel, q: &DVector<f64>) -> Result<Self, SimError> {
        if model.dof() == 0 {
            return Err(SimError::InvalidConfig(format!(
                "model '{}' has no links",
                model.name()
            )));
        }
        SimError::check_len(model.dof(), q.len())?;

        let mut pose = Isometry3::identity();
        let frames = model
            .links()
            .iter()
            .zip(q.iter())
            .map(|(link, &qi)| {
                pose *= link.dh.transform(qi);
                pose
            })
            .collect();

        Ok(Self { frames })
    }

    /// 自由度
    pub fn dof(&self) -> usize {
        self.frames.len()
    }

    /// 连杆 i 的位姿
    pub fn frame(&self, i: usize) -> &Isometry3<f64> {
        &self.frames[i]
    }

    /// 连杆 i 的原点（世界系）
    pub fn origin(&self, i: usize) -> Vector3<f64> {
        self.frames[i].translation.vector
    }

    /// 关节 i 的转轴（世界系单位向量）
    pub fn axis(&self, i: usize) -> Vector3<f64> {
        self.frames[i].rotation * Vector3::z()
    }

    /// 连杆 i 的旋转矩阵
    pub fn rotation(&self, i: usize) -> Matrix3<f64> {
        self.frames[i].rotation.to_rotation_matrix().into_inner()
    }

    /// 最后一个连杆的位姿
    pub fn last_frame(&self) -> &Isometry3<f64> {
        &self.frames[self.frames.len() - 1]
    }

    /// 连杆 i 坐标系中的点变换到世界系
    pub fn point_in_world(&self, i: usize, local: &Vector3<f64>) -> Vector3<f64> {
        (self.frames[i] * Point3::from(*local)).coords
    }

    /// 末端执行器位置（最后一个连杆坐标系中偏置 `offset` 处）
    pub fn end_effector(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.point_in_world(self.dof() - 1, offset)
    }

    /// 世界系中点 `point` 的几何雅可比
    ///
    /// 只有前 `upto` 个关节参与（点固连在连杆 `upto - 1` 上），其余列为零。
    /// 前 3 行为线速度，后 3 行为角速度。
    pub fn jacobian(&self, point: &Vector3<f64>, upto: usize) -> Matrix6xX<f64> {
        let mut jacobian = Matrix6xX::zeros(self.dof());
        for j in 0..upto.min(self.dof()) {
            let z = self.axis(j);
            let linear = z.cross(&(point - self.origin(j)));
            jacobian.fixed_view_mut::<3, 1>(0, j).copy_from(&linear);
            jacobian.fixed_view_mut::<3, 1>(3, j).copy_from(&z);
        }
        jacobian
    }
}
