//! DOT node/edge coloring (grounded on `internal/color/{color.go,palette.go}`
//! in the original tool). We only need hex strings for Graphviz attributes,
//! so `Color` is a bare wrapper instead of the original's RGBA struct.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color(pub String);

impl Color {
    pub fn hex(&self) -> &str {
        &self.0
    }
}

/// One half of a [`Palette`]: the colors used for entities that are (or
/// are not) part of an import cycle.
#[derive(Debug, Clone)]
pub struct HalfPalette {
    pub package_name: Color,
    pub package_background: Color,
    pub file_name: Color,
    pub file_background: Color,
    pub import_arrow: Color,
}

#[derive(Debug, Clone)]
pub struct Palette {
    pub base: HalfPalette,
    pub cycle: HalfPalette,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            base: HalfPalette {
                package_name: Color("#1a1a1a".into()),
                package_background: Color("#f2f2f2".into()),
                file_name: Color("#1a1a1a".into()),
                file_background: Color("#ffffff".into()),
                import_arrow: Color("#555555".into()),
            },
            cycle: HalfPalette {
                package_name: Color("#7a0000".into()),
                package_background: Color("#ffe0e0".into()),
                file_name: Color("#7a0000".into()),
                file_background: Color("#ffc9c9".into()),
                import_arrow: Color("#c62828".into()),
            },
        }
    }
}

impl Palette {
    pub fn half_for(&self, in_cycle: bool) -> &HalfPalette {
        if in_cycle {
            &self.cycle
        } else {
            &self.base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_picks_cycle_half() {
        let p = Palette::default();
        assert_eq!(p.half_for(true).package_background.hex(), "#ffe0e0");
        assert_eq!(p.half_for(false).package_background.hex(), "#f2f2f2");
    }
}
