use std::str::FromStr;

use thiserror::Error;

use crate::uniform::{UniformData, UniformKind, UniformType, UniformValue};

/// Straight-alpha RGBA color with channels in `[0, 1]`.
///
/// Bound as a `vec4<f32>` uniform in `r, g, b, a` order. Shaders multiply by
/// alpha themselves when they need premultiplied output.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("expected `rgb(R, G, B)` or `rgba(R, G, B, A)`, got `{0}`")]
    Syntax(String),

    #[error("`{name}` channel is not a valid value: `{value}`")]
    Channel { name: &'static str, value: String },
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn transparent() -> Self {
        Self::rgba(0.0, 0.0, 0.0, 0.0)
    }

    /// Creates a color from 8-bit channels (`0`–`255`).
    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Parses a CSS functional color: `rgb(R, G, B)` or `rgba(R, G, B, A)`.
    ///
    /// `R`, `G`, `B` are integers in `0..=255` and are divided by 255. `A` is
    /// taken as-is (`0.0`–`1.0`) and defaults to `1.0`. This is the form
    /// browsers report for computed colors.
    pub fn parse_css(input: &str) -> Result<Self, ColorParseError> {
        let syntax = || ColorParseError::Syntax(input.to_string());

        let s = input.trim();
        let args = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(syntax)?;

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let (rgb, alpha) = match parts.as_slice() {
            [r, g, b] => ([*r, *g, *b], None),
            [r, g, b, a] => ([*r, *g, *b], Some(*a)),
            _ => return Err(syntax()),
        };

        let [r, g, b] = [("red", rgb[0]), ("green", rgb[1]), ("blue", rgb[2])]
            .map(|(name, value)| parse_channel(name, value));

        let a = match alpha {
            None => 1.0,
            Some(value) => value
                .parse::<f32>()
                .ok()
                .filter(|a| (0.0..=1.0).contains(a))
                .ok_or_else(|| ColorParseError::Channel {
                    name: "alpha",
                    value: value.to_string(),
                })?,
        };

        Ok(Self::rgba(r?, g?, b?, a))
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Premultiplied copy (`rgb * a`).
    #[inline]
    pub fn premultiplied(self) -> Self {
        Self::rgba(self.r * self.a, self.g * self.a, self.b * self.a, self.a)
    }
}

fn parse_channel(name: &'static str, value: &str) -> Result<f32, ColorParseError> {
    value
        .parse::<u8>()
        .map(|v| f32::from(v) / 255.0)
        .map_err(|_| ColorParseError::Channel {
            name,
            value: value.to_string(),
        })
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_css(s)
    }
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl UniformData for Color {
    const TYPE: UniformType = UniformType {
        kind: UniformKind::Float,
        arity: 4,
    };

    fn into_value(self) -> UniformValue {
        UniformValue::F4(self.to_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rgb() {
        let c = Color::parse_css("rgb(255, 0, 51)").unwrap();
        assert_eq!(c, Color::rgba(1.0, 0.0, 0.2, 1.0));
    }

    #[test]
    fn parses_rgba_with_fractional_alpha() {
        let c = Color::parse_css("rgba(0, 255, 0, 0.5)").unwrap();
        assert_eq!(c.to_array(), [0.0, 1.0, 0.0, 0.5]);
    }

    #[test]
    fn tolerates_whitespace() {
        let c: Color = "  rgba(10,20 ,  30, 1)  ".parse().unwrap();
        assert_eq!(c, Color::from_u8(10, 20, 30, 255));
    }

    #[test]
    fn rejects_other_notations() {
        for input in ["#ff0000", "hsl(0, 100%, 50%)", "rgb(1, 2)", "rgb(1, 2, 3", ""] {
            assert!(
                matches!(Color::parse_css(input), Err(ColorParseError::Syntax(_))),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_channels() {
        assert_eq!(
            Color::parse_css("rgb(256, 0, 0)"),
            Err(ColorParseError::Channel {
                name: "red",
                value: "256".to_string()
            })
        );
        assert!(matches!(
            Color::parse_css("rgba(0, 0, 0, 1.5)"),
            Err(ColorParseError::Channel { name: "alpha", .. })
        ));
    }

    #[test]
    fn binds_as_vec4() {
        assert_eq!(Color::TYPE.to_string(), "4f");
        assert_eq!(
            Color::rgba(0.1, 0.2, 0.3, 0.4).into_value(),
            UniformValue::F4([0.1, 0.2, 0.3, 0.4])
        );
    }

    #[test]
    fn premultiplies() {
        let c = Color::rgba(1.0, 0.5, 0.0, 0.5).premultiplied();
        assert_eq!(c.to_array(), [0.5, 0.25, 0.0, 0.5]);
    }
}
