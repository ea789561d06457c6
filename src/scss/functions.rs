//! Built-in color functions applied to evaluated values.

use regex::Captures;

static_regex!(
    color_fn_re,
    r"\b(rgba|lighten|darken)\(\s*#([0-9a-fA-F]{6}|[0-9a-fA-F]{3})\s*,\s*(\d*\.?\d+)%?\s*\)"
);

/// Replace `rgba(#hex, a)`, `lighten(#hex, n%)` and `darken(#hex, n%)` calls.
///
/// Calls with non-literal arguments are left for the browser.
pub fn apply(value: &str) -> String {
    if !value.contains('(') {
        return value.to_string();
    }
    color_fn_re()
        .replace_all(value, |caps: &Captures| {
            let (Some(rgb), Ok(amount)) = (parse_hex(&caps[2]), caps[3].parse::<f64>()) else {
                return caps[0].to_string();
            };
            match &caps[1] {
                "rgba" => format!("rgba({}, {}, {}, {})", rgb[0], rgb[1], rgb[2], &caps[3]),
                "lighten" => to_hex(adjust_lightness(rgb, amount / 100.0)),
                _ => to_hex(adjust_lightness(rgb, -amount / 100.0)),
            }
        })
        .into_owned()
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let expanded: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };
    let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

fn adjust_lightness(rgb: [u8; 3], delta: f64) -> [u8; 3] {
    let (h, s, l) = rgb_to_hsl(rgb);
    hsl_to_rgb(h, s, (l + delta).clamp(0.0, 1.0))
}

fn rgb_to_hsl(rgb: [u8; 3]) -> (f64, f64, f64) {
    let [r, g, b] = rgb.map(|c| c as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if max == min {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return [v, v, v];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round() as u8
    };
    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_from_hex() {
        assert_eq!(apply("rgba(#ff0000, 0.5)"), "rgba(255, 0, 0, 0.5)");
        assert_eq!(apply("0 1px rgba(#000, .2)"), "0 1px rgba(0, 0, 0, .2)");
    }

    #[test]
    fn test_lighten_and_darken() {
        assert_eq!(apply("lighten(#000, 50%)"), "#808080");
        assert_eq!(apply("darken(#ffffff, 100%)"), "#000000");
        assert_eq!(apply("darken(#ff0000, 0%)"), "#ff0000");
    }

    #[test]
    fn test_round_trip_saturated_color() {
        assert_eq!(apply("lighten(#336699, 0%)"), "#336699");
    }

    #[test]
    fn test_non_literal_arguments_untouched() {
        assert_eq!(apply("rgba(0, 0, 0, 0.5)"), "rgba(0, 0, 0, 0.5)");
        assert_eq!(apply("lighten(currentColor, 10%)"), "lighten(currentColor, 10%)");
    }
}
