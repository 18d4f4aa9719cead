// Expand a 5-bit color channel to the full 8-bit range
pub fn scale_color(c: u8) -> u8 {
    ((c as u16) * 255 / 31) as u8
}

pub fn percent(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * processed as f64 / total as f64
}

// Valid C identifier, used for generated symbol names
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
