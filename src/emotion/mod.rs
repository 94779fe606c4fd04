//! Emotion palette: background, readable text color and a Korean color name
//! for each mood the diary tracks, plus naming and companion palettes for the
//! free-form color hints the assistant sends.

mod tone;

pub use tone::{
    color_name, gradient_colors, gradient_css, hex_to_hsl, hsl_to_hex, palette_from_base,
    random_gradient_angle, BasePalette, GradientColors, Hsl, Rgb,
};

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmotionColor {
    pub background: &'static str,
    pub text: &'static str,
    pub color_name: &'static str,
}

const DARK_TEXT: &str = "#2C2C2C";
const LIGHT_TEXT: &str = "#FFFFFF";

const DEFAULT_COLOR: EmotionColor = EmotionColor {
    background: "#95A5A6",
    text: LIGHT_TEXT,
    color_name: "회색",
};

// Light backgrounds first (dark text), then mid and intense tones (white text).
const PALETTE_ENTRIES: &[(&str, EmotionColor)] = &[
    ("기쁨", EmotionColor { background: "#FFD93D", text: DARK_TEXT, color_name: "노란색" }),
    ("설렘", EmotionColor { background: "#FF6B9D", text: LIGHT_TEXT, color_name: "분홍색" }),
    ("평온", EmotionColor { background: "#A8E6CF", text: DARK_TEXT, color_name: "연두색" }),
    ("만족", EmotionColor { background: "#B4E7CE", text: DARK_TEXT, color_name: "민트색" }),
    ("감사", EmotionColor { background: "#FFB6C1", text: DARK_TEXT, color_name: "연분홍색" }),
    ("희망", EmotionColor { background: "#87CEEB", text: DARK_TEXT, color_name: "하늘색" }),
    ("불안", EmotionColor { background: "#9B59B6", text: LIGHT_TEXT, color_name: "보라색" }),
    ("슬픔", EmotionColor { background: "#5DADE2", text: LIGHT_TEXT, color_name: "파란색" }),
    ("외로움", EmotionColor { background: "#34495E", text: LIGHT_TEXT, color_name: "회색" }),
    ("좌절", EmotionColor { background: "#95A5A6", text: LIGHT_TEXT, color_name: "진회색" }),
    ("피곤", EmotionColor { background: "#7F8C8D", text: LIGHT_TEXT, color_name: "어두운 회색" }),
    ("분노", EmotionColor { background: "#E74C3C", text: LIGHT_TEXT, color_name: "빨간색" }),
    ("짜증", EmotionColor { background: "#E67E22", text: LIGHT_TEXT, color_name: "주황색" }),
    ("질투", EmotionColor { background: "#16A085", text: LIGHT_TEXT, color_name: "청록색" }),
    ("후회", EmotionColor { background: "#8E44AD", text: LIGHT_TEXT, color_name: "자주색" }),
    ("두려움", EmotionColor { background: "#2C3E50", text: LIGHT_TEXT, color_name: "남색" }),
];

static PALETTE: Lazy<HashMap<&'static str, EmotionColor>> =
    Lazy::new(|| PALETTE_ENTRIES.iter().copied().collect());

/// Palette entry for `emotion`, or the neutral grey default.
pub fn emotion_color(emotion: &str) -> EmotionColor {
    PALETTE.get(emotion.trim()).copied().unwrap_or(DEFAULT_COLOR)
}

pub fn default_emotion_color() -> EmotionColor {
    DEFAULT_COLOR
}

/// Known emotion names in palette order.
pub fn known_emotions() -> Vec<&'static str> {
    PALETTE_ENTRIES.iter().map(|(name, _)| *name).collect()
}

/// Dark text on light backgrounds, white otherwise. Uses perceived luminance
/// `(0.299r + 0.587g + 0.114b) / 255`; anything but `#rrggbb` gets white.
pub fn contrast_text_color(background: &str) -> &'static str {
    match parse_hex_rgb(background) {
        Some((r, g, b)) => {
            let luminance = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
            if luminance > 0.5 {
                DARK_TEXT
            } else {
                LIGHT_TEXT
            }
        }
        None => LIGHT_TEXT,
    }
}

fn parse_hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#').get(0..6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
