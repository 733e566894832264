//! 动力学性质测试（随机位形）

use approx::assert_relative_eq;
use armctl_sim::dynamics::{bias_torques, gravity_torques, mass_matrix, rnea};
use armctl_sim::opspace::{OperationalSpace, inverse_task_inertia, min_eigenvalue};
use armctl_sim::{ArmModel, Kinematics, PANDA_DOF};
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;

fn configuration() -> impl Strategy<Value = [f64; PANDA_DOF]> {
    prop::array::uniform7(-2.5f64..2.5)
}

fn vector() -> impl Strategy<Value = [f64; PANDA_DOF]> {
    prop::array::uniform7(-3.0f64..3.0)
}

fn kinematics(model: &ArmModel, q: &[f64]) -> Kinematics {
    Kinematics::compute(model, &DVector::from_column_slice(q)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mass_matrix_is_symmetric_positive_definite(q in configuration()) {
        let model = ArmModel::panda();
        let mass = mass_matrix(&model, &kinematics(&model, &q));

        prop_assert!((&mass - mass.transpose()).amax() < 1e-12);
        prop_assert!(mass.clone().cholesky().is_some());
    }

    #[test]
    fn rnea_without_velocity_or_gravity_is_mass_times_acceleration(
        q in configuration(),
        ddq in vector(),
    ) {
        let model = ArmModel::panda();
        let kin = kinematics(&model, &q);
        let ddq = DVector::from_column_slice(&ddq);

        let tau = rnea(&model, &kin, &DVector::zeros(PANDA_DOF), &ddq, false).unwrap();
        assert_relative_eq!(tau, mass_matrix(&model, &kin) * &ddq, epsilon = 1e-9);
    }

    #[test]
    fn bias_at_rest_is_gravity(q in configuration()) {
        let model = ArmModel::panda();
        let kin = kinematics(&model, &q);

        let bias = bias_torques(&model, &kin, &DVector::zeros(PANDA_DOF)).unwrap();
        prop_assert_eq!(bias, gravity_torques(&model, &kin));
    }

    #[test]
    fn regular_task_torques_realise_position_acceleration(
        q in configuration(),
        ddx in prop::array::uniform3(-1.0f64..1.0),
    ) {
        let model = ArmModel::panda();
        let kin = kinematics(&model, &q);
        let mass_inv = mass_matrix(&model, &kin).cholesky().unwrap().inverse();
        let ee = kin.end_effector(model.ee_offset());
        let full = kin.jacobian(&ee, PANDA_DOF);
        let jacobian = DMatrix::from_fn(3, PANDA_DOF, |r, c| full[(r, c)]);

        prop_assume!(min_eigenvalue(&inverse_task_inertia(&jacobian, &mass_inv)) > 0.01);

        let os = OperationalSpace::new(jacobian.clone(), &mass_inv).unwrap();
        let ddx = DVector::from_column_slice(&ddx);
        let realised = &jacobian * (&mass_inv * os.task_torques(&ddx).unwrap());
        assert_relative_eq!(realised, ddx, epsilon = 1e-6);
    }
}
