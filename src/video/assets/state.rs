//! The fixed-function pipeline state applied before draw calls.

/// Specify whether front- or back-facing polygons can be culled.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

/// Define front- and back-facing polygons.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum FrontFaceOrder {
    Clockwise,
    CounterClockwise,
}

/// A pixel-wise comparison function.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Never,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Always,
}

/// Specifies how incoming RGBA values (source) and the RGBA in framebuffer
/// (destination) are combined.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Equation {
    /// Adds source and destination. Source and destination are multiplied
    /// by blending parameters before addition.
    Add,
    /// Subtracts destination from source. Source and destination are
    /// multiplied by blending parameters before subtraction.
    Subtract,
    /// Subtracts source from destination. Source and destination are
    /// multiplied by blending parameters before subtraction.
    ReverseSubtract,
    /// Component-wise minimum, blending parameters are ignored.
    Min,
    /// Component-wise maximum, blending parameters are ignored.
    Max,
}

/// Blend values.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BlendValue {
    SourceColor,
    SourceAlpha,
    DestinationColor,
    DestinationAlpha,
}

/// Blend factors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    Value(BlendValue),
    OneMinusValue(BlendValue),
}

/// The rasterizer state bundle. It is a plain value, two states are the same
/// state if every field compares equal.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterizerState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_mode: Comparison,
    pub blend: bool,
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub blend_equation: Equation,
    pub cull: bool,
    pub cull_face: CullFace,
    pub winding: FrontFaceOrder,
}

impl Default for RasterizerState {
    fn default() -> Self {
        RasterizerState {
            depth_test: true,
            depth_write: true,
            depth_mode: Comparison::LessOrEqual,
            blend: true,
            blend_src: BlendFactor::Value(BlendValue::SourceAlpha),
            blend_dst: BlendFactor::OneMinusValue(BlendValue::SourceAlpha),
            blend_equation: Equation::Add,
            cull: true,
            cull_face: CullFace::Back,
            winding: FrontFaceOrder::CounterClockwise,
        }
    }
}

impl RasterizerState {
    /// The state used by full-screen passes: no depth, no blending and no culling.
    pub fn overlay() -> Self {
        RasterizerState {
            depth_test: false,
            depth_write: false,
            depth_mode: Comparison::Always,
            blend: false,
            cull: false,
            ..RasterizerState::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_partial() {
        let state: RasterizerState =
            serde_json::from_str(r#"{ "depth_write": false, "cull_face": "Front" }"#).unwrap();

        assert_eq!(state.depth_write, false);
        assert_eq!(state.cull_face, CullFace::Front);
        assert_eq!(state.depth_test, true);
        assert_eq!(state.blend_equation, Equation::Add);
    }
}
