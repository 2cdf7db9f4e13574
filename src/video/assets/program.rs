//! Program descriptors and uniform values.

use std::fmt;

use crate::math;

impl_handle!(ProgramHandle);

/// The location of a uniform variable inside a linked program, `-1` if the
/// program does not declare it.
pub type UniformLocation = i32;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Compute => "compute",
        };

        write!(f, "{}", name)
    }
}

/// One stage of a program, with its source already include-expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSourceDescriptor {
    pub stage: ShaderStage,
    pub source: String,
}

impl ShaderSourceDescriptor {
    pub fn new<T: Into<String>>(stage: ShaderStage, source: T) -> Self {
        ShaderSourceDescriptor {
            stage,
            source: source.into(),
        }
    }
}

/// Uniform variable for graphics program object. Matrices are column major.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformVariable {
    I32(i32),
    F32(f32),
    Vector2f([f32; 2]),
    Vector3f([f32; 3]),
    Vector4f([f32; 4]),
    Matrix3f([[f32; 3]; 3]),
    Matrix4f([[f32; 4]; 4]),
    Matrix4fArray(Vec<[[f32; 4]; 4]>),
}

impl From<i32> for UniformVariable {
    fn from(v: i32) -> Self {
        UniformVariable::I32(v)
    }
}

impl From<f32> for UniformVariable {
    fn from(v: f32) -> Self {
        UniformVariable::F32(v)
    }
}

impl From<[f32; 2]> for UniformVariable {
    fn from(v: [f32; 2]) -> Self {
        UniformVariable::Vector2f(v)
    }
}

impl From<[f32; 3]> for UniformVariable {
    fn from(v: [f32; 3]) -> Self {
        UniformVariable::Vector3f(v)
    }
}

impl From<[f32; 4]> for UniformVariable {
    fn from(v: [f32; 4]) -> Self {
        UniformVariable::Vector4f(v)
    }
}

impl From<math::Color> for UniformVariable {
    fn from(v: math::Color) -> Self {
        UniformVariable::Vector4f(v.into())
    }
}

impl From<math::Vector2<f32>> for UniformVariable {
    fn from(v: math::Vector2<f32>) -> Self {
        UniformVariable::Vector2f(v.into())
    }
}

impl From<math::Vector3<f32>> for UniformVariable {
    fn from(v: math::Vector3<f32>) -> Self {
        UniformVariable::Vector3f(v.into())
    }
}

impl From<math::Vector4<f32>> for UniformVariable {
    fn from(v: math::Vector4<f32>) -> Self {
        UniformVariable::Vector4f(v.into())
    }
}

impl From<math::Matrix3<f32>> for UniformVariable {
    fn from(v: math::Matrix3<f32>) -> Self {
        UniformVariable::Matrix3f(v.into())
    }
}

impl From<math::Matrix4<f32>> for UniformVariable {
    fn from(v: math::Matrix4<f32>) -> Self {
        UniformVariable::Matrix4f(v.into())
    }
}

impl<'a> From<&'a [math::Matrix4<f32>]> for UniformVariable {
    fn from(v: &'a [math::Matrix4<f32>]) -> Self {
        UniformVariable::Matrix4fArray(v.iter().map(|&m| m.into()).collect())
    }
}
