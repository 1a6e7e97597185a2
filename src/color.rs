use std::collections::{BTreeMap, BTreeSet};

use crate::core::Rgb;

/// Saturation used for every categorical palette entry.
pub const PALETTE_SATURATION: f64 = 0.8;
/// Value (brightness) used for every categorical palette entry.
pub const PALETTE_VALUE: f64 = 0.9;

/// Convert HSV (all components in [0,1]) to RGB.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let h = h.rem_euclid(1.0);
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (i as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Rgb::new(r, g, b)
}

/// One color per distinct category, hues partitioned evenly across the
/// sorted category set. The mapping depends only on the set of values, never
/// on their order of appearance.
pub fn categorical_palette<'a, I>(values: I) -> BTreeMap<String, Rgb>
where
    I: IntoIterator<Item = &'a str>,
{
    let distinct: BTreeSet<&str> = values.into_iter().collect();
    let n = distinct.len();

    distinct
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let hue = i as f64 / n as f64;
            (
                value.to_string(),
                hsv_to_rgb(hue, PALETTE_SATURATION, PALETTE_VALUE),
            )
        })
        .collect()
}

/// Resource quantity per schedule time unit. Zero-duration activities have
/// rate 0 rather than an undefined division.
pub fn daily_rate(resources: f64, start: f64, end: f64) -> f64 {
    let span = end - start;
    if span > 0.0 { resources / span } else { 0.0 }
}

/// Map a normalized utilization value to the heatmap gradient: the red
/// channel follows the value, blue its complement, green stays zero.
pub fn utilization_color(normalized: f64) -> Rgb {
    let u = normalized.clamp(0.0, 1.0);
    Rgb::new(u, 0.0, 1.0 - u)
}
