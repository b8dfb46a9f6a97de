//! Color types and the pre-rendered glow sprite.
//!
//! Colors are authored in HSL (hue in degrees, saturation and lightness in
//! percent) the way the circadian palettes are written, and converted to
//! linear `0.0..=1.0` RGBA at draw time.

use glam::Vec2;
use image::{Rgba as Pixel, RgbaImage};
use serde::{Deserialize, Serialize};

/// RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    /// Build from 8-bit channel values.
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Component-wise linear blend.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        Rgb {
            r: lerp(self.r, other.r, t),
            g: lerp(self.g, other.g, t),
            b: lerp(self.b, other.b, t),
        }
    }

    /// Attach an alpha channel.
    pub fn with_alpha(self, a: f32) -> Rgba {
        Rgba::new(self.r, self.g, self.b, a)
    }
}

/// RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with alpha multiplied by `factor`.
    pub fn fade(self, factor: f32) -> Rgba {
        Rgba {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Same color with alpha replaced.
    pub fn with_alpha(self, a: f32) -> Rgba {
        Rgba {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// HSL color: hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    /// Blend toward `other`, taking the shortest way around the hue circle.
    pub fn lerp(self, other: Hsl, t: f32) -> Hsl {
        Hsl {
            h: lerp_hue(self.h, other.h, t),
            s: lerp(self.s, other.s, t),
            l: lerp(self.l, other.l, t),
        }
    }

    /// Shift lightness, clamped to `0..=100`.
    pub fn lighten(self, amount: f32) -> Hsl {
        Hsl {
            l: (self.l + amount).clamp(0.0, 100.0),
            ..self
        }
    }

    pub fn to_rgb(self) -> Rgb {
        let h = self.h.rem_euclid(360.0) / 360.0;
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);

        if s == 0.0 {
            return Rgb { r: l, g: l, b: l };
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Rgb {
            r: hue_to_channel(p, q, h + 1.0 / 3.0),
            g: hue_to_channel(p, q, h),
            b: hue_to_channel(p, q, h - 1.0 / 3.0),
        }
    }

    pub fn to_rgba(self, alpha: f32) -> Rgba {
        self.to_rgb().with_alpha(alpha)
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolate two hues (degrees) along the shortest arc. Result is in `0..360`.
pub fn lerp_hue(from: f32, to: f32, t: f32) -> f32 {
    let mut delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    (from + delta * t).rem_euclid(360.0)
}

/// How per-particle glow halos are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlowMode {
    /// Build a radial gradient per particle per frame.
    #[default]
    Gradient,
    /// Blit one pre-rendered sprite, tinted per particle.
    Sprite,
}

/// Side length of the pre-rendered glow sprite in pixels.
pub const GLOW_SPRITE_SIZE: u32 = 64;

/// White radial falloff rendered once per organism and tinted on blit.
#[derive(Debug, Clone)]
pub struct GlowSprite {
    image: RgbaImage,
}

impl GlowSprite {
    /// Render the sprite: alpha falls off quadratically from the center.
    pub fn render(size: u32) -> Self {
        let size = size.max(2);
        let half = size as f32 / 2.0;
        let image = RgbaImage::from_fn(size, size, |x, y| {
            let d = Vec2::new(x as f32 + 0.5 - half, y as f32 + 0.5 - half).length() / half;
            let falloff = (1.0 - d).clamp(0.0, 1.0);
            Pixel([255, 255, 255, (falloff * falloff * 255.0).round() as u8])
        });
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Sprite alpha at normalized offset `uv` (`-1..=1` on both axes).
    pub fn sample(&self, uv: Vec2) -> f32 {
        let size = self.image.width() as f32;
        let px = ((uv.x * 0.5 + 0.5) * size).clamp(0.0, size - 1.0) as u32;
        let py = ((uv.y * 0.5 + 0.5) * size).clamp(0.0, size - 1.0) as u32;
        self.image.get_pixel(px, py)[3] as f32 / 255.0
    }
}

impl Default for GlowSprite {
    fn default() -> Self {
        Self::render(GLOW_SPRITE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsl_primaries() {
        let red = Hsl::new(0.0, 100.0, 50.0).to_rgb();
        assert!((red.r - 1.0).abs() < 1e-4 && red.g.abs() < 1e-4 && red.b.abs() < 1e-4);

        let blue = Hsl::new(240.0, 100.0, 50.0).to_rgb();
        assert!(blue.r.abs() < 1e-4 && blue.g.abs() < 1e-4 && (blue.b - 1.0).abs() < 1e-4);

        let gray = Hsl::new(123.0, 0.0, 40.0).to_rgb();
        assert!((gray.r - 0.4).abs() < 1e-4 && (gray.g - 0.4).abs() < 1e-4);
    }

    #[test]
    fn test_hue_lerp_takes_short_way() {
        // 350 -> 10 should pass through 0, not 180
        let mid = lerp_hue(350.0, 10.0, 0.5);
        assert!(mid < 1e-3 || (mid - 360.0).abs() < 1e-3);

        let quarter = lerp_hue(10.0, 350.0, 0.25);
        assert!((quarter - 5.0).abs() < 1e-3);

        assert!((lerp_hue(100.0, 200.0, 0.5) - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_glow_sprite_falloff() {
        let sprite = GlowSprite::default();
        assert_eq!(sprite.size(), GLOW_SPRITE_SIZE);
        let center = sprite.sample(Vec2::ZERO);
        let edge = sprite.sample(Vec2::new(0.99, 0.0));
        let corner = sprite.sample(Vec2::new(1.0, 1.0));
        assert!(center > 0.9);
        assert!(edge < 0.05);
        assert_eq!(corner, 0.0);
    }
}
