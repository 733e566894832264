//! 操作空间控制（Khatib）
//!
//! 给定任务雅可比 `J`（k × n，k = 3 或 6）和质量矩阵 `M`：
//!
//! ```text
//! Λ⁻¹ = J M⁻¹ Jᵀ              任务空间惯量的逆
//! Λ   = pinv(Λ⁻¹)             SVD 伪逆，近奇异时保持有界
//! J̄   = M⁻¹ Jᵀ Λ              动态一致广义逆
//! N   = I − J̄ J               零空间投影
//! τ   = Jᵀ Λ ẍ + Nᵀ M q̈₀      任务力矩 + 零空间力矩
//! ```

use crate::error::SimError;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// 伪逆奇异值截断阈值
const PSEUDO_INVERSE_EPS: f64 = 1e-10;

/// `Λ⁻¹ = J M⁻¹ Jᵀ`
pub fn inverse_task_inertia(jacobian: &DMatrix<f64>, mass_inv: &DMatrix<f64>) -> DMatrix<f64> {
    jacobian * mass_inv * jacobian.transpose()
}

/// 对称矩阵的最小特征值
pub fn min_eigenvalue(symmetric: &DMatrix<f64>) -> f64 {
    SymmetricEigen::new(symmetric.clone())
        .eigenvalues
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// 奇异判定：`Λ⁻¹` 的最小特征值低于容差
///
/// 容差为绝对值，与雅可比的行数无关。
pub fn is_singular(jacobian: &DMatrix<f64>, mass_inv: &DMatrix<f64>, tolerance: f64) -> bool {
    min_eigenvalue(&inverse_task_inertia(jacobian, mass_inv)) < tolerance
}

/// 某一位形下的操作空间分解
#[derive(Debug, Clone)]
pub struct OperationalSpace {
    jacobian: DMatrix<f64>,
    task_inertia: DMatrix<f64>,
    dynamically_consistent_inverse: DMatrix<f64>,
}

impl OperationalSpace {
    /// 由任务雅可比和质量矩阵的逆构造
    ///
    /// # 错误
    ///
    /// - 维度不一致 → [`SimError::DimensionMismatch`]
    /// - SVD 伪逆失败 → [`SimError::Numeric`]
    pub fn new(jacobian: DMatrix<f64>, mass_inv: &DMatrix<f64>) -> Result<Self, SimError> {
        SimError::check_len(mass_inv.nrows(), jacobian.ncols())?;

        let task_inertia = inverse_task_inertia(&jacobian, mass_inv)
            .pseudo_inverse(PSEUDO_INVERSE_EPS)
            .map_err(|e| SimError::Numeric(format!("task inertia pseudo-inverse: {e}")))?;
        let dynamically_consistent_inverse = mass_inv * jacobian.transpose() * &task_inertia;

        Ok(Self {
            jacobian,
            task_inertia,
            dynamically_consistent_inverse,
        })
    }

    /// 任务维度（雅可比行数）
    pub fn task_dim(&self) -> usize {
        self.jacobian.nrows()
    }

    /// 任务空间惯量 `Λ`
    pub fn task_inertia(&self) -> &DMatrix<f64> {
        &self.task_inertia
    }

    /// 动态一致广义逆 `J̄`
    pub fn dynamically_consistent_inverse(&self) -> &DMatrix<f64> {
        &self.dynamically_consistent_inverse
    }

    /// 实现任务加速度 `ẍ` 的力矩 `Jᵀ Λ ẍ`
    pub fn task_torques(&self, ddx: &DVector<f64>) -> Result<DVector<f64>, SimError> {
        SimError::check_len(self.task_dim(), ddx.len())?;
        Ok(self.jacobian.transpose() * (&self.task_inertia * ddx))
    }

    /// 零空间投影 `N = I − J̄ J`
    pub fn nullspace_projector(&self) -> DMatrix<f64> {
        let dof = self.jacobian.ncols();
        DMatrix::identity(dof, dof) - &self.dynamically_consistent_inverse * &self.jacobian
    }

    /// 零空间力矩 `Nᵀ M q̈₀`（不干扰任务空间加速度）
    pub fn nullspace_torques(
        &self,
        mass: &DMatrix<f64>,
        ddq_posture: &DVector<f64>,
    ) -> Result<DVector<f64>, SimError> {
        SimError::check_len(self.jacobian.ncols(), ddq_posture.len())?;
        Ok(self.nullspace_projector().transpose() * (mass * ddq_posture))
    }
}
