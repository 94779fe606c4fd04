//! Color naming and palettes derived from a single hint color.

use serde::Serialize;

/// Nearest-match radius in RGB space; anything farther keeps its hex code.
const NEAREST_NAME_DISTANCE: f64 = 100.0;

const GRADIENT_ANGLES: [u16; 7] = [45, 90, 135, 180, 225, 270, 315];

const NAMED_COLORS: &[(&str, &str)] = &[
    // 빨강
    ("FF6B6B", "밝은 빨강"),
    ("FF4757", "선명한 빨강"),
    ("EE5A6F", "코랄 빨강"),
    ("FF7979", "연한 빨강"),
    ("FF3838", "진한 빨강"),
    // 주황
    ("FFA07A", "연어색"),
    ("FF8C42", "따뜻한 주황"),
    ("FF9F43", "밝은 주황"),
    ("FFB142", "골든 오렌지"),
    ("FF9966", "복숭아색"),
    // 노랑
    ("FFD93D", "생동감 있는 노랑"),
    ("FFF176", "밝은 레몬"),
    ("FFEB3B", "선명한 노랑"),
    ("FFF9C3", "창백한 노랑"),
    ("FFE66D", "부드러운 노랑"),
    ("FFDD59", "따뜻한 노랑"),
    // 초록
    ("6BCF7F", "밝은 초록"),
    ("95E1D3", "민트 초록"),
    ("26DE81", "생생한 초록"),
    ("7BED9F", "연한 초록"),
    ("A8E6CF", "파스텔 초록"),
    ("20BF6B", "싱그러운 초록"),
    // 파랑
    ("48DBF8", "하늘색"),
    ("54A0FF", "밝은 파랑"),
    ("74B9FF", "연한 하늘색"),
    ("0ABDE3", "청록색"),
    ("4FC3F7", "맑은 파랑"),
    ("5F9DF7", "선명한 파랑"),
    // 보라
    ("A29BFE", "밝은 보라"),
    ("B39DDB", "연한 보라"),
    ("8B7FD1", "부드러운 보라"),
    ("9B59B6", "진한 보라"),
    ("C88EA7", "로즈 퍼플"),
    // 분홍
    ("FDA7DF", "밝은 분홍"),
    ("FFB8D0", "파스텔 핑크"),
    ("F48FB1", "로즈 핑크"),
    ("FF6B9D", "선명한 분홍"),
    ("FFC2D1", "연한 분홍"),
    // 회색
    ("DFE4EA", "밝은 회색"),
    ("C8D6E5", "구름 회색"),
    ("B8C6DB", "연한 회색"),
    ("A4B0BE", "중간 회색"),
    ("E8E8E8", "은은한 회색"),
    // 갈색
    ("D7A86E", "따뜻한 갈색"),
    ("C49C94", "로즈 베이지"),
    ("A67C52", "카라멜색"),
    // 기타
    ("F5F5F5", "거의 흰색"),
    ("FFFFFF", "순백색"),
    ("000000", "순검정"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    fn distance(self, other: Rgb) -> f64 {
        let d = |a: u8, b: u8| (a as f64 - b as f64).powi(2);
        (d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)).sqrt()
    }
}

/// Hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// Three companion colors for a base hint: lighter, darker, shifted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasePalette {
    pub light: String,
    pub dark: String,
    pub shifted: String,
}

/// Four stops for a gradient around a base hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradientColors {
    pub base: String,
    pub bright: String,
    pub deep: String,
    pub mid: String,
}

/// Korean name for a hint color: exact match, else the nearest named color
/// within an RGB distance of 100, else the input unchanged.
pub fn color_name(hex: &str) -> String {
    let key = hex.trim().trim_start_matches('#');
    if let Some((_, name)) = NAMED_COLORS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(key))
    {
        return (*name).to_string();
    }

    let Some(target) = Rgb::parse(hex) else {
        return hex.to_string();
    };
    NAMED_COLORS
        .iter()
        .filter_map(|(code, name)| Rgb::parse(code).map(|rgb| (target.distance(rgb), *name)))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .filter(|(distance, _)| *distance < NEAREST_NAME_DISTANCE)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| hex.to_string())
}

pub fn hex_to_hsl(hex: &str) -> Option<Hsl> {
    let rgb = Rgb::parse(hex)?;
    let (r, g, b) = (
        rgb.r as f64 / 255.0,
        rgb.g as f64 / 255.0,
        rgb.b as f64 / 255.0,
    );
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Some(Hsl { h: 0.0, s: 0.0, l: l * 100.0 });
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

    Some(Hsl {
        h: h / 6.0 * 360.0,
        s: s * 100.0,
        l: l * 100.0,
    })
}

/// Lowercase `#rrggbb`. Hue wraps; saturation and lightness are clamped.
pub fn hsl_to_hex(hsl: Hsl) -> String {
    let h = hsl.h.rem_euclid(360.0);
    let s = hsl.s.clamp(0.0, 100.0) / 100.0;
    let l = hsl.l.clamp(0.0, 100.0) / 100.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

pub fn palette_from_base(hex: &str) -> Option<BasePalette> {
    let Hsl { h, s, l } = hex_to_hsl(hex)?;
    Some(BasePalette {
        light: hsl_to_hex(Hsl { h, s: (s * 1.15).min(100.0), l: (l * 1.15).min(95.0) }),
        dark: hsl_to_hex(Hsl {
            h: (h + 300.0) % 360.0,
            s: (s * 0.9).min(100.0),
            l: (l * 0.75).max(15.0),
        }),
        shifted: hsl_to_hex(Hsl {
            h: (h + 60.0) % 360.0,
            s: (s * 1.1).min(100.0),
            l: (l * 1.05).min(90.0),
        }),
    })
}

pub fn gradient_colors(hex: &str) -> Option<GradientColors> {
    let Hsl { h, s, l } = hex_to_hsl(hex)?;
    Some(GradientColors {
        base: hex.to_string(),
        bright: hsl_to_hex(Hsl {
            h: (h + 45.0) % 360.0,
            s: (s * 1.25).min(100.0),
            l: (l * 1.3).min(85.0),
        }),
        deep: hsl_to_hex(Hsl {
            h: (h + 315.0) % 360.0,
            s: (s * 1.15).min(100.0),
            l: (l * 0.75).max(25.0),
        }),
        mid: hsl_to_hex(Hsl {
            h: (h + 25.0) % 360.0,
            s: (s * 1.2).min(100.0),
            l: (l * 1.1).min(80.0),
        }),
    })
}

pub fn random_gradient_angle() -> u16 {
    GRADIENT_ANGLES[fastrand::usize(..GRADIENT_ANGLES.len())]
}

/// CSS `linear-gradient(...)` over [`gradient_colors`] at `angle` degrees.
pub fn gradient_css(hex: &str, angle: u16) -> Option<String> {
    let g = gradient_colors(hex)?;
    Some(format!(
        "linear-gradient({angle}deg, {} 0%, {} 30%, {} 60%, {} 100%)",
        g.base, g.bright, g.mid, g.deep
    ))
}
