//! Math type aliases.
//!
//! All rendering math is f32 and built on `nalgebra`; the aliases here cover
//! the vector and matrix shapes the uniform system supports.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 2D vector (i32).
pub type IVec2 = nalgebra::Vector2<i32>;

/// 3D vector (i32).
pub type IVec3 = nalgebra::Vector3<i32>;

/// 4D vector (i32).
pub type IVec4 = nalgebra::Vector4<i32>;

/// 2x2 matrix (f32).
pub type Mat2 = nalgebra::Matrix2<f32>;

/// 2x3 matrix (f32, 2 rows x 3 columns).
pub type Mat2x3 = nalgebra::Matrix2x3<f32>;

/// 2x4 matrix (f32, 2 rows x 4 columns).
pub type Mat2x4 = nalgebra::Matrix2x4<f32>;

/// 3x2 matrix (f32, 3 rows x 2 columns).
pub type Mat3x2 = nalgebra::Matrix3x2<f32>;

/// 3x3 matrix (f32).
pub type Mat3 = nalgebra::Matrix3<f32>;

/// 3x4 matrix (f32, 3 rows x 4 columns).
pub type Mat3x4 = nalgebra::Matrix3x4<f32>;

/// 4x2 matrix (f32, 4 rows x 2 columns).
pub type Mat4x2 = nalgebra::Matrix4x2<f32>;

/// 4x3 matrix (f32, 4 rows x 3 columns).
pub type Mat4x3 = nalgebra::Matrix4x3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_shapes() {
        let m = Mat2x3::zeros();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);

        let m = Mat4x2::zeros();
        assert_eq!(m.nrows(), 4);
        assert_eq!(m.ncols(), 2);
    }
}
