/// A RGBA `Color`. Each color component is a floating point value
/// with a range from 0 to 1.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    /// Clip to [0.0, 1.0] range.
    pub fn clip(&self) -> Color {
        Color::new(
            clamp(self.r, 0.0, 1.0),
            clamp(self.g, 0.0, 1.0),
            clamp(self.b, 0.0, 1.0),
            clamp(self.a, 0.0, 1.0),
        )
    }

    /// Quantizes the clipped color into 8-bits RGBA components.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let c = self.clip();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
            (c.a * 255.0).round() as u8,
        ]
    }

    pub fn white() -> Self {
        Color::new(1.0, 1.0, 1.0, 1.0)
    }

    pub fn gray() -> Self {
        Color::new(0.5, 0.5, 0.5, 1.0)
    }

    pub fn black() -> Self {
        Color::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn red() -> Self {
        Color::new(1.0, 0.0, 0.0, 1.0)
    }

    pub fn green() -> Self {
        Color::new(0.0, 1.0, 0.0, 1.0)
    }

    pub fn blue() -> Self {
        Color::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn transparent() -> Self {
        Color::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl From<[u8; 4]> for Color {
    fn from(v: [u8; 4]) -> Self {
        Color::new(
            f32::from(v[0]) / 255.0,
            f32::from(v[1]) / 255.0,
            f32::from(v[2]) / 255.0,
            f32::from(v[3]) / 255.0,
        )
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

fn clamp(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quantize() {
        assert_eq!(Color::red().to_rgba8(), [255, 0, 0, 255]);
        assert_eq!(Color::new(2.0, -1.0, 0.5, 1.0).to_rgba8(), [255, 0, 128, 255]);
        assert_eq!(Color::from([0, 255, 0, 255]), Color::green());
    }
}
