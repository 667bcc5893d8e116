use core::str::FromStr;

pub use csscolorparser::ParseColorError;

/// RGBA color with components in `[0, 1]`, straight (non-premultiplied) alpha.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

impl Color {
    #[inline]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Opaque color from RGB components.
    #[inline]
    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self::new(red, green, blue, 1.0)
    }

    /// Parse a CSS color string (`"#rrggbb"`, `"white"`, `"rgb(…)"`, …).
    pub fn from_css(value: &str) -> Result<Self, ParseColorError> {
        let parsed = csscolorparser::parse(value)?;
        Ok(Self::new(parsed.r, parsed.g, parsed.b, parsed.a))
    }

    /// RGBA array in draw-command order.
    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        self.alpha <= 0.0
    }
}

impl Default for Color {
    fn default() -> Self {
        WHITE
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_css(value)
    }
}
