//! Typed uniform values and the per-material uniform table.
//!
//! [`UniformValue`] is the single tagged union covering every uniform kind
//! the scaffold supports: the scalar families (f32, i32, u32, f64, f16),
//! their 2/3/4-component vector forms, every 2..4 x 2..4 f32 matrix, and
//! texture bindings (held next to the table, uploaded as unit indices).
//! One value type plus one kind-keyed upload dispatch in the backend
//! replaces a per-kind setter method for each of these.
//!
//! [`UniformTable`] maps uniform names to resolved program slots and
//! current values, and enforces the open -> locked name lifecycle:
//!
//! - **Open**: new names may be declared and set freely.
//! - **Locked**: setting an already-known name succeeds; introducing a new
//!   name is governed by the [`LockPolicy`]. The lenient default resolves
//!   the slot, completes the operation, and records a warning; the strict
//!   policy fails hard.
//!
//! Locking is one-directional; there is no unlock.

use std::collections::BTreeMap;
use std::sync::Arc;

use half::f16;
use nalgebra::{
    Matrix2, Matrix2x3, Matrix2x4, Matrix3, Matrix3x2, Matrix3x4, Matrix4, Matrix4x2, Matrix4x3,
    Vector2, Vector3, Vector4,
};

use crate::backend::{RenderBackend, TextureUnit, UniformSlot};
use crate::error::{RenderError, RenderResult};
use crate::program::ShaderProgram;
use crate::texture::Texture;

/// Discriminant of a [`UniformValue`], plus the texture kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
    Double,
    Half,
    Vec2,
    IVec2,
    HVec2,
    Vec3,
    IVec3,
    HVec3,
    Vec4,
    IVec4,
    HVec4,
    Mat2,
    Mat2x3,
    Mat2x4,
    Mat3x2,
    Mat3,
    Mat3x4,
    Mat4x2,
    Mat4x3,
    Mat4,
    Texture,
}

/// Upload category of a uniform kind.
///
/// Values are pushed category by category at bind time, in this declaration
/// order; a category with no entries is skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformCategory {
    Texture,
    Scalar,
    Vector,
    Matrix,
}

impl UniformKind {
    /// The upload category this kind belongs to.
    pub fn category(self) -> UniformCategory {
        use UniformKind::*;
        match self {
            Texture => UniformCategory::Texture,
            Float | Int | UInt | Double | Half => UniformCategory::Scalar,
            Vec2 | IVec2 | HVec2 | Vec3 | IVec3 | HVec3 | Vec4 | IVec4 | HVec4 => {
                UniformCategory::Vector
            }
            Mat2 | Mat2x3 | Mat2x4 | Mat3x2 | Mat3 | Mat3x4 | Mat4x2 | Mat4x3 | Mat4 => {
                UniformCategory::Matrix
            }
        }
    }
}

/// A typed uniform value.
///
/// Matrix variants use nalgebra's row x column naming and are uploaded
/// column-major, never transposed.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Double(f64),
    Half(f16),
    Vec2(Vector2<f32>),
    IVec2(Vector2<i32>),
    HVec2(Vector2<f16>),
    Vec3(Vector3<f32>),
    IVec3(Vector3<i32>),
    HVec3(Vector3<f16>),
    Vec4(Vector4<f32>),
    IVec4(Vector4<i32>),
    HVec4(Vector4<f16>),
    Mat2(Matrix2<f32>),
    Mat2x3(Matrix2x3<f32>),
    Mat2x4(Matrix2x4<f32>),
    Mat3x2(Matrix3x2<f32>),
    Mat3(Matrix3<f32>),
    Mat3x4(Matrix3x4<f32>),
    Mat4x2(Matrix4x2<f32>),
    Mat4x3(Matrix4x3<f32>),
    Mat4(Matrix4<f32>),
}

impl UniformValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Int(_) => UniformKind::Int,
            Self::UInt(_) => UniformKind::UInt,
            Self::Double(_) => UniformKind::Double,
            Self::Half(_) => UniformKind::Half,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::IVec2(_) => UniformKind::IVec2,
            Self::HVec2(_) => UniformKind::HVec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::IVec3(_) => UniformKind::IVec3,
            Self::HVec3(_) => UniformKind::HVec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::IVec4(_) => UniformKind::IVec4,
            Self::HVec4(_) => UniformKind::HVec4,
            Self::Mat2(_) => UniformKind::Mat2,
            Self::Mat2x3(_) => UniformKind::Mat2x3,
            Self::Mat2x4(_) => UniformKind::Mat2x4,
            Self::Mat3x2(_) => UniformKind::Mat3x2,
            Self::Mat3(_) => UniformKind::Mat3,
            Self::Mat3x4(_) => UniformKind::Mat3x4,
            Self::Mat4x2(_) => UniformKind::Mat4x2,
            Self::Mat4x3(_) => UniformKind::Mat4x3,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// The upload category of this value.
    pub fn category(&self) -> UniformCategory {
        self.kind().category()
    }
}

macro_rules! impl_from_uniform_value {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for UniformValue {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_uniform_value! {
    f32 => Float,
    i32 => Int,
    u32 => UInt,
    f64 => Double,
    f16 => Half,
    Vector2<f32> => Vec2,
    Vector2<i32> => IVec2,
    Vector2<f16> => HVec2,
    Vector3<f32> => Vec3,
    Vector3<i32> => IVec3,
    Vector3<f16> => HVec3,
    Vector4<f32> => Vec4,
    Vector4<i32> => IVec4,
    Vector4<f16> => HVec4,
    Matrix2<f32> => Mat2,
    Matrix2x3<f32> => Mat2x3,
    Matrix2x4<f32> => Mat2x4,
    Matrix3x2<f32> => Mat3x2,
    Matrix3<f32> => Mat3,
    Matrix3x4<f32> => Mat3x4,
    Matrix4x2<f32> => Mat4x2,
    Matrix4x3<f32> => Mat4x3,
    Matrix4<f32> => Mat4,
}

/// Name lifecycle state of a [`UniformTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// New names may be declared and set freely.
    Open,
    /// The name set is closed; see [`LockPolicy`] for new-name handling.
    Locked,
}

/// How a locked table treats operations that introduce a new name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Resolve the slot and complete the operation, but log a warning and
    /// count the violation.
    #[default]
    Lenient,
    /// Fail with [`RenderError::LockedUniform`].
    Strict,
}

/// Mapping from uniform names to resolved slots and current values.
#[derive(Debug, Default)]
pub struct UniformTable {
    /// Resolved slot per declared name, shared by every kind.
    slots: BTreeMap<String, UniformSlot>,
    /// Current non-texture value per name. A name lives in at most one kind
    /// at a time; re-setting with a different kind migrates it (last writer
    /// wins).
    values: BTreeMap<String, UniformValue>,
    /// Texture bindings: assigned unit and the texture itself.
    textures: BTreeMap<String, (TextureUnit, Arc<Texture>)>,

    scalar_count: usize,
    vector_count: usize,
    matrix_count: usize,

    state: TableState,
    policy: LockPolicy,
    lock_violations: u32,
}

impl Default for TableState {
    fn default() -> Self {
        TableState::Open
    }
}

impl UniformTable {
    /// Create an open table with the lenient lock policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an open table with an explicit lock policy.
    pub fn with_policy(policy: LockPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TableState {
        self.state
    }

    /// Whether the name set has been locked.
    pub fn is_locked(&self) -> bool {
        self.state == TableState::Locked
    }

    /// The configured lock policy.
    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Number of lenient lock violations recorded so far.
    pub fn lock_violations(&self) -> u32 {
        self.lock_violations
    }

    /// Close the name set. One-directional; there is no unlock.
    pub fn lock(&mut self) {
        self.state = TableState::Locked;
    }

    /// Declared names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Number of declared names.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no names have been declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether a name has been declared.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// The resolved slot of a declared name.
    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    /// The current value of a name, if one has been set.
    pub fn value(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    /// The kind a name currently holds, if any.
    pub fn kind(&self, name: &str) -> Option<UniformKind> {
        if self.textures.contains_key(name) {
            return Some(UniformKind::Texture);
        }
        self.values.get(name).map(UniformValue::kind)
    }

    /// The texture unit assigned to a texture-kind name.
    pub fn texture_unit(&self, name: &str) -> Option<TextureUnit> {
        self.textures.get(name).map(|(unit, _)| *unit)
    }

    /// The texture bound to a texture-kind name.
    pub fn texture(&self, name: &str) -> Option<&Arc<Texture>> {
        self.textures.get(name).map(|(_, texture)| texture)
    }

    /// Resolve `name` to its slot in the program and record it.
    ///
    /// Fails with [`RenderError::UniformNotFound`] if the compiled program
    /// reports no such active uniform. Subject to the lock check.
    pub fn declare(&mut self, name: &str, program: &ShaderProgram) -> RenderResult<UniformSlot> {
        self.resolve(name, program)
    }

    /// Record a value for `name`, resolving its slot first.
    ///
    /// Same failure modes as [`UniformTable::declare`]. Setting a name that
    /// currently holds a different kind migrates it to the new kind.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<UniformValue>,
        program: &ShaderProgram,
    ) -> RenderResult<()> {
        let value = value.into();
        let category = value.category();
        self.resolve(name, program)?;

        self.textures.remove(name);
        if let Some(old) = self.values.insert(name.to_owned(), value) {
            self.decrement(old.category());
        }
        self.increment(category);
        Ok(())
    }

    /// Bind a texture to `name` on the given unit.
    ///
    /// Assigning the same unit to two different names is not detected; at
    /// bind time the later entry wins on that unit.
    pub fn set_texture(
        &mut self,
        name: &str,
        unit: TextureUnit,
        texture: Arc<Texture>,
        program: &ShaderProgram,
    ) -> RenderResult<()> {
        self.resolve(name, program)?;

        if let Some(old) = self.values.remove(name) {
            self.decrement(old.category());
        }
        self.textures.insert(name.to_owned(), (unit, texture));
        Ok(())
    }

    /// Push every declared value to the graphics state.
    ///
    /// Categories are visited in texture, scalar, vector, matrix order and
    /// skipped entirely when empty. Texture entries bind their texture to
    /// its unit and upload the unit number to the sampler slot. Any
    /// outstanding API error is surfaced afterwards.
    pub fn bind(&self, backend: &dyn RenderBackend) -> RenderResult<()> {
        if !self.textures.is_empty() {
            for (name, (unit, texture)) in &self.textures {
                texture.bind(*unit)?;
                if let Some(slot) = self.slots.get(name) {
                    backend.set_uniform(*slot, &UniformValue::Int(unit.index() as i32));
                }
            }
        }

        if self.scalar_count > 0 {
            self.push_category(backend, UniformCategory::Scalar);
        }
        if self.vector_count > 0 {
            self.push_category(backend, UniformCategory::Vector);
        }
        if self.matrix_count > 0 {
            self.push_category(backend, UniformCategory::Matrix);
        }

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }
        Ok(())
    }

    /// Release every registered texture and drop the bindings.
    pub(crate) fn dispose_textures(&mut self) {
        for (_unit, texture) in self.textures.values() {
            texture.dispose();
        }
        self.textures.clear();
    }

    fn push_category(&self, backend: &dyn RenderBackend, category: UniformCategory) {
        for (name, value) in &self.values {
            if value.category() != category {
                continue;
            }
            if let Some(slot) = self.slots.get(name) {
                backend.set_uniform(*slot, value);
            }
        }
    }

    fn resolve(&mut self, name: &str, program: &ShaderProgram) -> RenderResult<UniformSlot> {
        let slot = program.uniform_location(name)?;

        if self.state == TableState::Locked && !self.slots.contains_key(name) {
            match self.policy {
                LockPolicy::Strict => {
                    return Err(RenderError::LockedUniform(name.to_owned()));
                }
                LockPolicy::Lenient => {
                    self.lock_violations += 1;
                    log::warn!(
                        "uniform table is locked to new names and does not recognise {name:?} \
                         as an already known uniform"
                    );
                }
            }
        }

        self.slots.insert(name.to_owned(), slot);
        Ok(slot)
    }

    fn increment(&mut self, category: UniformCategory) {
        match category {
            UniformCategory::Scalar => self.scalar_count += 1,
            UniformCategory::Vector => self.vector_count += 1,
            UniformCategory::Matrix => self.matrix_count += 1,
            UniformCategory::Texture => {}
        }
    }

    fn decrement(&mut self, category: UniformCategory) {
        match category {
            UniformCategory::Scalar => self.scalar_count -= 1,
            UniformCategory::Vector => self.vector_count -= 1,
            UniformCategory::Matrix => self.matrix_count -= 1,
            UniformCategory::Texture => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_categories() {
        assert_eq!(UniformKind::Float.category(), UniformCategory::Scalar);
        assert_eq!(UniformKind::Half.category(), UniformCategory::Scalar);
        assert_eq!(UniformKind::IVec3.category(), UniformCategory::Vector);
        assert_eq!(UniformKind::Mat4x2.category(), UniformCategory::Matrix);
        assert_eq!(UniformKind::Texture.category(), UniformCategory::Texture);
    }

    #[test]
    fn value_kind_tags() {
        assert_eq!(UniformValue::Float(1.0).kind(), UniformKind::Float);
        assert_eq!(
            UniformValue::Half(f16::from_f32(0.5)).kind(),
            UniformKind::Half
        );
        assert_eq!(
            UniformValue::Mat2x4(Matrix2x4::zeros()).kind(),
            UniformKind::Mat2x4
        );
    }

    #[test]
    fn from_impls_pick_the_right_variant() {
        let v: UniformValue = 2.0f32.into();
        assert_eq!(v, UniformValue::Float(2.0));

        let v: UniformValue = Vector3::new(1i32, 2, 3).into();
        assert_eq!(v.kind(), UniformKind::IVec3);

        let v: UniformValue = Matrix4::<f32>::identity().into();
        assert_eq!(v.kind(), UniformKind::Mat4);
    }

    #[test]
    fn table_starts_open_and_lenient() {
        let table = UniformTable::new();
        assert_eq!(table.state(), TableState::Open);
        assert_eq!(table.policy(), LockPolicy::Lenient);
        assert!(table.is_empty());
        assert_eq!(table.lock_violations(), 0);
    }

    #[test]
    fn lock_is_one_directional() {
        let mut table = UniformTable::new();
        table.lock();
        assert!(table.is_locked());
        // There is no unlock operation; locking again is a no-op.
        table.lock();
        assert!(table.is_locked());
    }
}
