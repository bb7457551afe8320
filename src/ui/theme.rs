use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub header_accent_bg: Color,
    pub header_accent_fg: Color,
    pub status_ok: Color,
    pub status_warn: Color,
    pub statusbar_bg: Color,
    pub overlay_border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,
    pub pill_key_bg: Color,
    pub pill_key_fg: Color,
    pub pill_desc_fg: Color,
    pub surface_bg: Color,
    pub gauge_filled: Color,
    pub gauge_unfilled: Color,
    pub chart_line: Color,
    pub growth_up: Color,
    pub growth_down: Color,
}

impl Theme {
    pub fn from_config(theme_name: &str) -> Self {
        match theme_name.to_lowercase().as_str() {
            "light" => Self::light(),
            "mono" | "monochrome" => Self::mono(),
            _ => Self::dark(),
        }
    }

    pub fn dark() -> Self {
        Theme {
            name: "dark",
            header_accent_bg: Color::Green,
            header_accent_fg: Color::Black,
            status_ok: Color::Green,
            status_warn: Color::Rgb(249, 115, 22),
            statusbar_bg: Color::DarkGray,
            overlay_border: Color::DarkGray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            accent: Color::Green,
            pill_key_bg: Color::Yellow,
            pill_key_fg: Color::Black,
            pill_desc_fg: Color::White,
            surface_bg: Color::DarkGray,
            gauge_filled: Color::Rgb(103, 232, 249),
            gauge_unfilled: Color::DarkGray,
            chart_line: Color::Rgb(251, 146, 60),
            growth_up: Color::Rgb(239, 68, 68),
            growth_down: Color::Rgb(16, 185, 129),
        }
    }

    pub fn light() -> Self {
        Theme {
            name: "light",
            header_accent_bg: Color::Blue,
            header_accent_fg: Color::White,
            status_ok: Color::Rgb(0, 120, 0),
            status_warn: Color::Rgb(200, 100, 0),
            statusbar_bg: Color::Rgb(220, 220, 220),
            overlay_border: Color::Rgb(150, 150, 150),
            text_primary: Color::Black,
            text_secondary: Color::DarkGray,
            accent: Color::Blue,
            pill_key_bg: Color::Blue,
            pill_key_fg: Color::White,
            pill_desc_fg: Color::Black,
            surface_bg: Color::Rgb(200, 200, 200),
            gauge_filled: Color::Rgb(70, 130, 180),
            gauge_unfilled: Color::Rgb(200, 200, 200),
            chart_line: Color::Rgb(70, 130, 180),
            growth_up: Color::Rgb(200, 60, 60),
            growth_down: Color::Rgb(60, 160, 60),
        }
    }

    pub fn mono() -> Self {
        Theme {
            name: "mono",
            header_accent_bg: Color::White,
            header_accent_fg: Color::Black,
            status_ok: Color::White,
            status_warn: Color::White,
            statusbar_bg: Color::Black,
            overlay_border: Color::Gray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            accent: Color::White,
            pill_key_bg: Color::White,
            pill_key_fg: Color::Black,
            pill_desc_fg: Color::White,
            surface_bg: Color::Black,
            gauge_filled: Color::White,
            gauge_unfilled: Color::DarkGray,
            chart_line: Color::White,
            growth_up: Color::White,
            growth_down: Color::Gray,
        }
    }

    /// Color for a signed change: growth is the warning direction.
    pub fn delta_color(&self, delta: f64) -> Color {
        if delta > 0.0 {
            self.growth_up
        } else if delta < 0.0 {
            self.growth_down
        } else {
            self.text_secondary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_falls_back_to_dark() {
        assert_eq!(Theme::from_config("neon").name, "dark");
        assert_eq!(Theme::from_config("Light").name, "light");
        assert_eq!(Theme::from_config("monochrome").name, "mono");
    }

    #[test]
    fn growth_is_highlighted() {
        let theme = Theme::dark();
        assert_eq!(theme.delta_color(1.0), theme.growth_up);
        assert_eq!(theme.delta_color(-1.0), theme.growth_down);
        assert_eq!(theme.delta_color(0.0), theme.text_secondary);
    }
}
