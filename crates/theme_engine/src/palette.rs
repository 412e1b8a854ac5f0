use shared::domain::Palette;
use thiserror::Error;
use tracing::debug;

/// WCAG AA minimum for body text.
pub const MIN_TEXT_CONTRAST: f64 = 4.5;

const SAMPLE_TARGET: usize = 1000;
const CLUSTERS: usize = 6;
const KMEANS_ITERATIONS: usize = 5;
const ACCENT_MIN_DISTANCE: f64 = 50.0;

#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("no opaque pixels to sample")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn luminance(self) -> f64 {
        let linear = |c: u8| {
            let c = f64::from(c) / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    pub fn contrast_ratio(self, other: Rgb) -> f64 {
        let (a, b) = (self.luminance(), other.luminance());
        (a.max(b) + 0.05) / (a.min(b) + 0.05)
    }

    pub fn saturation(self) -> f64 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        if max == 0 {
            0.0
        } else {
            f64::from(max - min) / f64::from(max)
        }
    }

    pub fn distance(self, other: Rgb) -> f64 {
        let d = |a: u8, b: u8| f64::from(a) - f64::from(b);
        (d(self.r, other.r).powi(2) + d(self.g, other.g).powi(2) + d(self.b, other.b).powi(2)).sqrt()
    }
}

pub fn contrast_ratio(a: &str, b: &str) -> Option<f64> {
    Some(Rgb::from_hex(a)?.contrast_ratio(Rgb::from_hex(b)?))
}

/// Keeps `fg` when it is readable on `bg`, otherwise falls back to black or
/// white depending on how bright the background is.
pub fn ensure_contrast(fg: &str, bg: &str) -> String {
    let Some(bg_rgb) = Rgb::from_hex(bg) else {
        return fg.to_string();
    };
    match Rgb::from_hex(fg) {
        Some(fg_rgb) if fg_rgb.contrast_ratio(bg_rgb) >= MIN_TEXT_CONTRAST => fg.to_string(),
        _ => readable_on(bg_rgb).to_hex(),
    }
}

fn readable_on(bg: Rgb) -> Rgb {
    if bg.luminance() > 0.5 {
        Rgb::BLACK
    } else {
        Rgb::WHITE
    }
}

/// `rgba(r, g, b, alpha)` for a hex color; unparsable input is treated as white.
pub fn to_rgba(hex: &str, alpha: f32) -> String {
    let rgb = Rgb::from_hex(hex).unwrap_or(Rgb::WHITE);
    format!("rgba({}, {}, {}, {alpha})", rgb.r, rgb.g, rgb.b)
}

/// True for `#rgb`, `#rrggbb`, `#rrggbbaa` and `rgb(`/`rgba(` values.
pub fn is_color_value(value: &str) -> bool {
    let value = value.trim();
    if let Some(digits) = value.strip_prefix('#') {
        return matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit());
    }
    let lower = value.to_ascii_lowercase();
    lower.starts_with("rgb(") || lower.starts_with("rgba(")
}

/// Replaces malformed entries with the defaults and makes `fg` readable on `bg`.
pub fn sanitize_palette(palette: &Palette) -> Palette {
    let defaults = Palette::default();
    let pick = |value: &str, fallback: &str| {
        Rgb::from_hex(value)
            .map(Rgb::to_hex)
            .unwrap_or_else(|| fallback.to_string())
    };
    let bg = pick(&palette.bg, &defaults.bg);
    let fg = ensure_contrast(&pick(&palette.fg, &defaults.fg), &bg);
    Palette {
        fg,
        primary: pick(&palette.primary, &defaults.primary),
        accent1: pick(&palette.accent1, &defaults.accent1),
        accent2: pick(&palette.accent2, &defaults.accent2),
        neutral: pick(&palette.neutral, &defaults.neutral),
        bg,
    }
}

/// Decodes a PNG or JPEG and derives a palette from its dominant colors.
pub fn extract_palette(image_bytes: &[u8]) -> Result<Palette, PaletteError> {
    let rgba = image::load_from_memory(image_bytes)?.to_rgba8().into_raw();
    debug!(bytes = image_bytes.len(), pixels = rgba.len() / 4, "decoded image for palette");
    palette_from_rgba(&rgba)
}

/// Palette from raw RGBA8 pixel data.
pub fn palette_from_rgba(rgba: &[u8]) -> Result<Palette, PaletteError> {
    let samples = sample_pixels(rgba);
    let mut centroids = kmeans(&samples, CLUSTERS);
    if centroids.is_empty() {
        return Err(PaletteError::Empty);
    }
    centroids.sort_by(|a, b| a.luminance().total_cmp(&b.luminance()));

    let bg = centroids[0];
    let (fg, best_contrast) = centroids
        .iter()
        .map(|c| (*c, bg.contrast_ratio(*c)))
        .fold((Rgb::WHITE, 0.0), |best, next| if next.1 > best.1 { next } else { best });
    let fg = if best_contrast < MIN_TEXT_CONTRAST {
        readable_on(bg)
    } else {
        fg
    };

    let mut accents: Vec<Rgb> = centroids
        .iter()
        .copied()
        .filter(|c| c.distance(bg) > ACCENT_MIN_DISTANCE)
        .collect();
    accents.sort_by(|a, b| b.saturation().total_cmp(&a.saturation()));
    let primary = accents
        .first()
        .copied()
        .unwrap_or(centroids[centroids.len() - 1]);
    let accent1 = accents.get(1).copied().unwrap_or(primary);
    let accent2 = accents.get(2).copied().unwrap_or(accent1);
    let neutral = centroids[centroids.len() / 2];

    let palette = Palette {
        bg: bg.to_hex(),
        fg: fg.to_hex(),
        primary: primary.to_hex(),
        accent1: accent1.to_hex(),
        accent2: accent2.to_hex(),
        neutral: neutral.to_hex(),
    };
    debug!(?palette, "extracted palette");
    Ok(palette)
}

fn sample_pixels(rgba: &[u8]) -> Vec<Rgb> {
    let pixels = rgba.len() / 4;
    let step = (pixels / SAMPLE_TARGET).max(1);
    rgba.chunks_exact(4)
        .step_by(step)
        .filter(|px| px[3] > 128)
        .map(|px| Rgb::new(px[0], px[1], px[2]))
        .collect()
}

fn kmeans(colors: &[Rgb], k: usize) -> Vec<Rgb> {
    if colors.len() <= k {
        return colors.to_vec();
    }
    let mut centroids: Vec<Rgb> = (0..k).map(|i| colors[i * colors.len() / k]).collect();

    for _ in 0..KMEANS_ITERATIONS {
        let mut sums = vec![(0u64, 0u64, 0u64, 0u64); k];
        for color in colors {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|a, b| color.distance(*a.1).total_cmp(&color.distance(*b.1)))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let slot = &mut sums[nearest];
            slot.0 += u64::from(color.r);
            slot.1 += u64::from(color.g);
            slot.2 += u64::from(color.b);
            slot.3 += 1;
        }
        for (centroid, (r, g, b, n)) in centroids.iter_mut().zip(sums) {
            if n > 0 {
                let avg = |sum: u64| ((sum as f64) / (n as f64)).round() as u8;
                *centroid = Rgb::new(avg(r), avg(g), avg(b));
            }
        }
    }
    centroids
}

#[cfg(test)]
#[path = "tests/palette_tests.rs"]
mod tests;
