/// `#rgb` or `#rrggbb` (any case) to lowercase `#rrggbb`.
pub fn normalize_hex_color(raw: &str) -> Option<String> {
    let digits = raw.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let expanded = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => digits.to_string(),
        _ => return None,
    };
    Some(format!("#{}", expanded.to_ascii_lowercase()))
}

fn rgb(hex: &str) -> Option<(f64, f64, f64)> {
    let normalized = normalize_hex_color(hex)?;
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&normalized[range], 16)
            .ok()
            .map(f64::from)
    };
    Some((channel(1..3)?, channel(3..5)?, channel(5..7)?))
}

/// Perceived brightness below 120 counts as dark.
pub fn is_color_dark(hex: &str) -> Option<bool> {
    let (r, g, b) = rgb(hex)?;
    let brightness = (0.299 * r * r + 0.587 * g * g + 0.114 * b * b).sqrt();
    Some(brightness < 120.0)
}
