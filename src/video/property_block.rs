//! Named uniform values of a material.

use std::rc::{Rc, Weak};

use crate::math::{Color, Matrix4, Vector2, Vector3, Vector4};
use crate::utils::hash::FastHashMap;

use super::assets::prelude::*;
use super::device::GraphicsDevice;
use super::errors::*;
use super::resource::GraphicsObject;

/// A texture shared between its owner and the materials sampling it.
pub type SharedTexture = Rc<GraphicsObject<TextureHandle>>;

macro_rules! impl_property {
    ($field:ident, $set:ident, $get:ident, $ty:ty) => {
        pub fn $set(&mut self, name: &str, value: $ty) {
            self.$field.insert(name.to_owned(), value);
        }

        pub fn $get(&self, name: &str) -> Option<$ty> {
            self.$field.get(name).cloned()
        }
    };
}

/// Uniform values addressed by name, at most one per name and kind.
///
/// Textures are held weakly. A texture whose owner has dropped or disposed it
/// is detected at `apply`: its slot is cleared and the entry removed.
#[derive(Debug, Default, Clone)]
pub struct MaterialPropertyBlock {
    floats: FastHashMap<String, f32>,
    ints: FastHashMap<String, i32>,
    vectors2: FastHashMap<String, Vector2<f32>>,
    vectors3: FastHashMap<String, Vector3<f32>>,
    vectors4: FastHashMap<String, Vector4<f32>>,
    colors: FastHashMap<String, Color>,
    matrices: FastHashMap<String, Matrix4<f32>>,
    matrix_arrays: FastHashMap<String, Vec<Matrix4<f32>>>,
    textures: Vec<(String, Weak<GraphicsObject<TextureHandle>>)>,
}

impl MaterialPropertyBlock {
    pub fn new() -> Self {
        MaterialPropertyBlock::default()
    }

    impl_property!(floats, set_float, float, f32);
    impl_property!(ints, set_int, int, i32);
    impl_property!(vectors2, set_vector2, vector2, Vector2<f32>);
    impl_property!(vectors3, set_vector3, vector3, Vector3<f32>);
    impl_property!(vectors4, set_vector4, vector4, Vector4<f32>);
    impl_property!(colors, set_color, color, Color);
    impl_property!(matrices, set_matrix, matrix, Matrix4<f32>);

    pub fn set_matrix_array(&mut self, name: &str, value: &[Matrix4<f32>]) {
        self.matrix_arrays.insert(name.to_owned(), value.to_vec());
    }

    pub fn matrix_array(&self, name: &str) -> Option<&[Matrix4<f32>]> {
        self.matrix_arrays.get(name).map(|v| v.as_slice())
    }

    /// Samples `texture` through the sampler uniform `name`. Textures are bound
    /// to consecutive slots starting at 1, in the order they were first set.
    pub fn set_texture(&mut self, name: &str, texture: &SharedTexture) {
        let weak = Rc::downgrade(texture);
        match self.textures.iter_mut().find(|v| v.0 == name) {
            Some(v) => v.1 = weak,
            None => self.textures.push((name.to_owned(), weak)),
        }
    }

    /// Returns the texture sampled by `name` if it is still alive.
    pub fn texture(&self, name: &str) -> Option<SharedTexture> {
        self.textures
            .iter()
            .find(|v| v.0 == name)
            .and_then(|v| v.1.upgrade())
            .filter(|v| !v.is_disposed())
    }

    #[inline]
    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.iter().any(|v| v.0 == name)
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Removes every value named `name`, of any kind.
    pub fn remove(&mut self, name: &str) {
        self.floats.remove(name);
        self.ints.remove(name);
        self.vectors2.remove(name);
        self.vectors3.remove(name);
        self.vectors4.remove(name);
        self.colors.remove(name);
        self.matrices.remove(name);
        self.matrix_arrays.remove(name);
        self.textures.retain(|v| v.0 != name);
    }

    pub fn clear(&mut self) {
        *self = MaterialPropertyBlock::default();
    }

    pub fn is_empty(&self) -> bool {
        self.floats.is_empty()
            && self.ints.is_empty()
            && self.vectors2.is_empty()
            && self.vectors3.is_empty()
            && self.vectors4.is_empty()
            && self.colors.is_empty()
            && self.matrices.is_empty()
            && self.matrix_arrays.is_empty()
            && self.textures.is_empty()
    }

    /// Writes every value into the uniforms of the bound program. `owner`
    /// names the material in diagnostics.
    pub fn apply(&mut self, device: &mut GraphicsDevice, owner: &str) -> Result<()> {
        for (name, &v) in &self.floats {
            device.set_uniform(name, v)?;
        }

        for (name, &v) in &self.ints {
            device.set_uniform(name, v)?;
        }

        for (name, &v) in &self.vectors2 {
            device.set_uniform(name, v)?;
        }

        for (name, &v) in &self.vectors3 {
            device.set_uniform(name, v)?;
        }

        for (name, &v) in &self.vectors4 {
            device.set_uniform(name, v)?;
        }

        for (name, &v) in &self.colors {
            device.set_uniform(name, v)?;
        }

        for (name, &v) in &self.matrices {
            device.set_uniform(name, v)?;
        }

        for (name, v) in &self.matrix_arrays {
            device.set_uniform(name, v.as_slice())?;
        }

        let mut stale = Vec::new();
        for (i, (name, texture)) in self.textures.iter().enumerate() {
            let slot = i + 1;
            let alive = texture
                .upgrade()
                .filter(|v| !v.is_disposed() && device.is_texture_alive(v.handle()));

            match alive {
                Some(v) => device.set_uniform_texture(name, slot, v.handle())?,
                None => {
                    device.clear_uniform_texture(name, slot)?;
                    warn!(
                        "Texture '{}' of material '{}' is no longer available, its slot is cleared.",
                        name, owner
                    );

                    stale.push(i);
                }
            }
        }

        for i in stale.into_iter().rev() {
            self.textures.remove(i);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn values() {
        let mut block = MaterialPropertyBlock::new();
        assert!(block.is_empty());

        block.set_float("_Gloss", 0.5);
        block.set_float("_Gloss", 0.75);
        block.set_color("_Gloss", Color::red());
        assert_eq!(block.float("_Gloss"), Some(0.75));
        assert_eq!(block.color("_Gloss"), Some(Color::red()));
        assert_eq!(block.int("_Gloss"), None);

        block.remove("_Gloss");
        assert!(block.is_empty());
    }
}
