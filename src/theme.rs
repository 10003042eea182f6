//! Color palette for the host UI

use ratatui::style::Color;

/// The subset of a base16 scheme the folio host actually draws with.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub accent: Color,
    pub error: Color,
}

/// Default dark palette (Oceanic Next tones).
pub const DARK: Palette = Palette {
    background: Color::Rgb(0x1b, 0x2b, 0x34),
    foreground: Color::Rgb(0xd8, 0xde, 0xe9),
    muted: Color::Rgb(0x65, 0x73, 0x7e),
    accent: Color::Rgb(0x5f, 0xb3, 0xb3),
    error: Color::Rgb(0xec, 0x5f, 0x67),
};

/// Light palette used when the PDF dark-mode inversion is off.
pub const LIGHT: Palette = Palette {
    background: Color::Rgb(0xfa, 0xfa, 0xfa),
    foreground: Color::Rgb(0x2a, 0x2a, 0x2a),
    muted: Color::Rgb(0x8a, 0x8a, 0x8a),
    accent: Color::Rgb(0x0e, 0x7c, 0x86),
    error: Color::Rgb(0xc0, 0x3a, 0x2b),
};

impl Palette {
    /// Presentation-level inversion for dark mode: swap the fore- and
    /// background rather than re-rendering anything.
    #[must_use]
    pub fn inverted(self) -> Self {
        Self {
            background: self.foreground,
            foreground: self.background,
            ..self
        }
    }
}
