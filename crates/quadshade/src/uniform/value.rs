use std::fmt;

/// Component kind of a uniform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Float,
    Int,
}

/// Kind and component count (1..=4) of a uniform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformType {
    pub kind: UniformKind,
    pub arity: u8,
}

impl UniformType {
    #[inline]
    pub const fn new(kind: UniformKind, arity: u8) -> Self {
        Self { kind, arity }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.kind {
            UniformKind::Float => 'f',
            UniformKind::Int => 'i',
        };
        write!(f, "{}{}", self.arity, suffix)
    }
}

/// A uniform value of any supported arity/kind.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    F1(f32),
    F2([f32; 2]),
    F3([f32; 3]),
    F4([f32; 4]),
    I1(i32),
    I2([i32; 2]),
    I3([i32; 3]),
    I4([i32; 4]),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        use UniformKind::{Float, Int};
        match self {
            Self::F1(_) => UniformType::new(Float, 1),
            Self::F2(_) => UniformType::new(Float, 2),
            Self::F3(_) => UniformType::new(Float, 3),
            Self::F4(_) => UniformType::new(Float, 4),
            Self::I1(_) => UniformType::new(Int, 1),
            Self::I2(_) => UniformType::new(Int, 2),
            Self::I3(_) => UniformType::new(Int, 3),
            Self::I4(_) => UniformType::new(Int, 4),
        }
    }

    /// Native-endian bytes of the components, tightly packed.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::F1(v) => bytemuck::bytes_of(v),
            Self::F2(v) => bytemuck::cast_slice(v),
            Self::F3(v) => bytemuck::cast_slice(v),
            Self::F4(v) => bytemuck::cast_slice(v),
            Self::I1(v) => bytemuck::bytes_of(v),
            Self::I2(v) => bytemuck::cast_slice(v),
            Self::I3(v) => bytemuck::cast_slice(v),
            Self::I4(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Host types that can be pushed to a uniform.
pub trait UniformData: Copy + 'static {
    const TYPE: UniformType;

    fn into_value(self) -> UniformValue;
}

macro_rules! impl_uniform_data {
    ($($ty:ty => $variant:ident, $kind:ident, $arity:literal;)*) => {
        $(
            impl UniformData for $ty {
                const TYPE: UniformType = UniformType::new(UniformKind::$kind, $arity);

                #[inline]
                fn into_value(self) -> UniformValue {
                    UniformValue::$variant(self)
                }
            }
        )*
    };
}

impl_uniform_data! {
    f32 => F1, Float, 1;
    [f32; 2] => F2, Float, 2;
    [f32; 3] => F3, Float, 3;
    [f32; 4] => F4, Float, 4;
    i32 => I1, Int, 1;
    [i32; 2] => I2, Int, 2;
    [i32; 3] => I3, Int, 3;
    [i32; 4] => I4, Int, 4;
}
