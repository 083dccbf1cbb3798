//! Colour manipulation
//!
//! Conversions between sRGB, linear RGB, Oklab and its polar LCh form, plus
//! HLS as used for saturation and hue copying. Hex colours are `#rrggbb` or
//! `#rrggbbaa`; missing channels read as `ff`.

use std::f64::consts::PI;

use dabs_core::formulas::clamp;

use crate::error::RenderError;

/// RGBA coordinates between 0 and 1
pub type Rgba = [f64; 4];

/// Colour space used to interpolate between two colours
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixMode {
    /// Gamma-encoded sRGB with an additional gamma
    Srgb(f64),
    /// Linear RGB
    LinearRgb,
    /// Oklab, perceptually uniform
    Oklab,
}

/// Treatment of the alpha channel when mixing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    /// Interpolate alpha like the other channels
    Mix,
    /// Composite the first colour over the second
    Blend,
}

/// Convert from linear RGB to Oklab
#[must_use]
pub fn linear_rgb_to_oklab([r, g, b]: [f64; 3]) -> [f64; 3] {
    let l = 0.412_221_470_8 * r + 0.536_332_536_3 * g + 0.051_445_992_9 * b;
    let m = 0.211_903_498_2 * r + 0.680_699_545_1 * g + 0.107_396_956_6 * b;
    let s = 0.088_302_461_9 * r + 0.281_718_837_6 * g + 0.629_978_700_5 * b;

    let (l, m, s) = (l.cbrt(), m.cbrt(), s.cbrt());

    [
        0.210_454_255_3 * l + 0.793_617_785_0 * m - 0.004_072_046_8 * s,
        1.977_998_495_1 * l - 2.428_592_205_0 * m + 0.450_593_709_9 * s,
        0.025_904_037_1 * l + 0.782_771_766_2 * m - 0.808_675_766_0 * s,
    ]
}

/// Convert from Oklab to linear RGB
#[must_use]
pub fn oklab_to_linear_rgb([lightness, a, b]: [f64; 3]) -> [f64; 3] {
    let l = lightness + 0.396_337_777_4 * a + 0.215_803_757_3 * b;
    let m = lightness - 0.105_561_345_8 * a - 0.063_854_172_8 * b;
    let s = lightness - 0.089_484_177_5 * a - 1.291_485_548_0 * b;

    let (l, m, s) = (l * l * l, m * m * m, s * s * s);

    [
        4.076_741_662_1 * l - 3.307_711_591_3 * m + 0.230_969_929_2 * s,
        -1.268_438_004_6 * l + 2.609_757_401_1 * m - 0.341_319_396_5 * s,
        -0.004_196_086_3 * l - 0.703_418_614_7 * m + 1.707_614_701_0 * s,
    ]
}

/// Linear RGB coordinate to sRGB, clamped into `[0, 1]`
#[must_use]
pub fn srgb_nonlinear_transform(x: f64) -> f64 {
    if x >= 0.003_130_8 {
        clamp(1.055 * x.powf(1.0 / 2.4) - 0.055, 0.0, 1.0)
    } else {
        clamp(12.92 * x, 0.0, 1.0)
    }
}

/// sRGB coordinate to linear RGB
#[must_use]
pub fn srgb_nonlinear_transform_inverse(x: f64) -> f64 {
    if x >= 0.040_45 {
        ((x + 0.055) / 1.055).powf(2.4)
    } else {
        x / 12.92
    }
}

/// Lab to polar LCh
#[must_use]
pub fn lab_to_lch([l, a, b]: [f64; 3]) -> [f64; 3] {
    [l, a.hypot(b), b.atan2(a)]
}

/// Polar LCh to Lab
#[must_use]
pub fn lch_to_lab([l, c, h]: [f64; 3]) -> [f64; 3] {
    [l, c * h.cos(), c * h.sin()]
}

/// Parse `#rrggbb[aa]` notation
///
/// # Errors
/// Returns [`RenderError::InvalidColor`] for non-hex digits.
pub fn hex_to_float(hex: &str) -> Result<Rgba, RenderError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    let padded = format!("{digits:f<8}");
    let invalid = || RenderError::InvalidColor(hex.to_string());

    let mut rgba = [0.0; 4];
    for (i, channel) in rgba.iter_mut().enumerate() {
        let pair = padded.get(2 * i..2 * i + 2).ok_or_else(invalid)?;
        let value = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        *channel = f64::from(value) / 255.0;
    }
    Ok(rgba)
}

/// Format coordinates between 0 and 1 as hex notation
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn float_to_hex(coordinates: &[f64]) -> String {
    let mut hex = String::from("#");
    for value in coordinates {
        let byte = (value * 255.0).round_ties_even() as i64;
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Hex notation to Oklab LCh
///
/// # Errors
/// Returns [`RenderError::InvalidColor`] for malformed input.
pub fn hex_to_lch(hex: &str) -> Result<[f64; 3], RenderError> {
    let [r, g, b, _] = hex_to_float(hex)?;
    Ok(lab_to_lch(linear_rgb_to_oklab([
        srgb_nonlinear_transform_inverse(r),
        srgb_nonlinear_transform_inverse(g),
        srgb_nonlinear_transform_inverse(b),
    ])))
}

/// Oklab LCh to `#rrggbb`
#[must_use]
pub fn lch_to_hex(lch: [f64; 3]) -> String {
    float_to_hex(&oklab_to_linear_rgb(lch_to_lab(lch)).map(srgb_nonlinear_transform))
}

/// Rotate the Oklab hue of a hex colour by `x` radians, or set it when `absolute`
///
/// With `lightness_control`, lightness shifts by the change of
/// `lightness_control(h)` between the old and new hue. Alpha is kept.
///
/// # Errors
/// Returns [`RenderError::InvalidColor`] for malformed input.
pub fn adjust_hue(
    hex: &str,
    x: f64,
    absolute: bool,
    lightness_control: Option<fn(f64) -> f64>,
) -> Result<String, RenderError> {
    let [mut l, c, h] = hex_to_lch(hex)?;
    let new_h = if absolute { x } else { h + x };
    if let Some(control) = lightness_control {
        l += control(new_h) - control(h);
    }
    Ok(lch_to_hex([l, c, new_h]) + hex.get(7..).unwrap_or_default())
}

/// Python `colorsys.rgb_to_hls`
#[must_use]
#[allow(clippy::float_cmp, clippy::many_single_char_names)]
pub fn rgb_to_hls([r, g, b]: [f64; 3]) -> [f64; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let sum = max + min;
    let range = max - min;
    let l = sum / 2.0;
    if min == max {
        return [0.0, l, 0.0];
    }
    let s = if l <= 0.5 {
        range / sum
    } else {
        range / (2.0 - sum)
    };
    let rc = (max - r) / range;
    let gc = (max - g) / range;
    let bc = (max - b) / range;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    [(h / 6.0).rem_euclid(1.0), l, s]
}

/// Python `colorsys.hls_to_rgb`
#[must_use]
#[allow(clippy::float_cmp)]
pub fn hls_to_rgb([h, l, s]: [f64; 3]) -> [f64; 3] {
    if s == 0.0 {
        return [l, l, l];
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    [
        hls_channel(m1, m2, h + 1.0 / 3.0),
        hls_channel(m1, m2, h),
        hls_channel(m1, m2, h - 1.0 / 3.0),
    ]
}

fn hls_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

/// Give `origin` the HLS hue of `hue_source`, keeping its lightness, saturation and alpha
///
/// # Errors
/// Returns [`RenderError::InvalidColor`] for malformed input.
pub fn copy_hue(origin: &str, hue_source: &str) -> Result<String, RenderError> {
    let [r, g, b, _] = hex_to_float(hue_source)?;
    let [h, _, _] = rgb_to_hls([r, g, b]);
    let [r, g, b, a] = hex_to_float(origin)?;
    let [_, l, s] = rgb_to_hls([r, g, b]);
    let [r, g, b] = hls_to_rgb([h, l, s]);
    Ok(float_to_hex(&[r, g, b, a]))
}

/// Interpolate a coordinate with gamma correction
#[must_use]
pub fn interpolate(v1: f64, v2: f64, t: f64, gamma: f64) -> f64 {
    ((1.0 - t) * v1.powf(gamma) + t * v2.powf(gamma)).powf(1.0 / gamma)
}

fn interpolate3(c1: [f64; 3], c2: [f64; 3], t: f64, gamma: f64) -> [f64; 3] {
    [0, 1, 2].map(|i| interpolate(c1[i], c2[i], t, gamma))
}

/// Mix two colours, `t = 0` giving the first and `t = 1` the second
#[must_use]
pub fn mix(color1: Rgba, color2: Rgba, t: f64, mode: MixMode, alpha_mode: AlphaMode) -> Rgba {
    let [r1, g1, b1, a1] = color1;
    let [r2, g2, b2, a2] = color2;
    let (rgb1, rgb2) = ([r1, g1, b1], [r2, g2, b2]);

    let (alpha, t) = match alpha_mode {
        AlphaMode::Mix => (interpolate(a1, a2, t, 1.0), t),
        AlphaMode::Blend => {
            let alpha_a = a1 * (1.0 - t);
            let alpha = 1.0 - (1.0 - alpha_a) * (1.0 - a2);
            (alpha, a2 * (1.0 - alpha_a) / alpha)
        }
    };

    let [r, g, b] = match mode {
        MixMode::Srgb(gamma) => interpolate3(rgb1, rgb2, t, gamma),
        MixMode::LinearRgb => interpolate3(
            rgb1.map(srgb_nonlinear_transform_inverse),
            rgb2.map(srgb_nonlinear_transform_inverse),
            t,
            1.0,
        )
        .map(srgb_nonlinear_transform),
        MixMode::Oklab => oklab_to_linear_rgb(interpolate3(
            linear_rgb_to_oklab(rgb1.map(srgb_nonlinear_transform_inverse)),
            linear_rgb_to_oklab(rgb2.map(srgb_nonlinear_transform_inverse)),
            t,
            1.0,
        ))
        .map(srgb_nonlinear_transform),
    };

    [r, g, b, alpha]
}

/// Composite a translucent colour over a background, returning `#rrggbb`
///
/// # Errors
/// Returns [`RenderError::InvalidColor`] for malformed input.
pub fn opacify(hex: &str, background: &str) -> Result<String, RenderError> {
    let mixed = mix(
        hex_to_float(hex)?,
        hex_to_float(background)?,
        0.0,
        MixMode::Srgb(1.0),
        AlphaMode::Blend,
    );
    Ok(float_to_hex(&mixed[..3]))
}

/// Scale the HLS saturation of a colour, keeping alpha
///
/// # Errors
/// Returns [`RenderError::InvalidColor`] for malformed input.
pub fn multiply_saturation(hex: &str, factor: f64) -> Result<String, RenderError> {
    let [r, g, b, _] = hex_to_float(hex)?;
    let [h, l, s] = rgb_to_hls([r, g, b]);
    Ok(float_to_hex(&hls_to_rgb([h, l, s * factor])) + hex.get(7..).unwrap_or_default())
}

/// Lightness correction applied while rotating hues
fn lightness_control(h: f64) -> f64 {
    (h - 0.1).sin() / 80.0
}

/// Colours of the DOT graph, derived from one base colour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// Top-level package outline and top-to-top requirements
    pub top: String,
    /// Top-level package fill
    pub top_fill: String,
    /// Shared requirement groups
    pub requires: String,
    /// Edges into requirement groups
    pub requires_edge: String,
    /// Advised packages and advises edges
    pub advises: String,
    /// Advised package group fill
    pub advises_fill: String,
}

impl Palette {
    /// Derive the palette from translucent moonstone blue over white
    ///
    /// # Errors
    /// Returns [`RenderError::InvalidColor`] if a derived colour is malformed.
    pub fn derive() -> Result<Self, RenderError> {
        let white = "#ffffff";
        let moonstone_blue = opacify("#2080a0a0", white)?;
        let antique_brass = adjust_hue(&moonstone_blue, -PI, false, Some(lightness_control))?;
        let dark_sea_green =
            adjust_hue(&moonstone_blue, -PI / 3.0, false, Some(lightness_control))?;
        let light_silver = opacify(&format!("{dark_sea_green}60"), white)?;
        let desert_sand = opacify(&format!("{antique_brass}a0"), white)?;

        Ok(Self {
            requires_edge: format!("{moonstone_blue}80"),
            requires: moonstone_blue,
            top: antique_brass,
            top_fill: desert_sand,
            advises: dark_sea_green,
            advises_fill: light_silver,
        })
    }
}
