pub const RATING_FLOOR: f64 = 0.0;
pub const RATING_CEILING: f64 = 5.0;

/// Marker color with channels in `[0, 1]`. Always fully opaque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl RgbColor {
    pub fn hex(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}",
            channel_byte(self.red),
            channel_byte(self.green),
            channel_byte(self.blue)
        )
    }
}

/// Clamp a rating into `[0, 5]`. NaN counts as the floor.
pub fn clamp_rating(rating: f64) -> f64 {
    if rating.is_nan() {
        return RATING_FLOOR;
    }
    rating.max(RATING_FLOOR).min(RATING_CEILING)
}

/// Linear red to green gradient: 0 is pure red, 5 is pure green.
pub fn color_for(rating: f64) -> RgbColor {
    let clamped = clamp_rating(rating);
    RgbColor {
        red: (RATING_CEILING - clamped) / RATING_CEILING,
        green: clamped / RATING_CEILING,
        blue: 0.0,
    }
}

/// Rating as shown in list rows, e.g. `4.5`.
pub fn rating_label(rating: f64) -> String {
    format!("{rating:.1}")
}

fn channel_byte(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
