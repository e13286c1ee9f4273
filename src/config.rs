//! Run configuration: resolution granularity, palette, and debug logging
//! (grounded on `internal/config/config.go`, adapted to load palette
//! overrides from TOML via `serde`/`toml` rather than Go struct literals).

use std::path::Path;

use serde::Deserialize;

use crate::color::{Color, HalfPalette, Palette};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    File,
    Package,
}

impl std::str::FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(Resolution::File),
            "package" => Ok(Resolution::Package),
            other => Err(Error::Config(format!(
                "unknown --resolution value {other:?}, expected \"file\" or \"package\""
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub resolution: Resolution,
    pub palette: Palette,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            resolution: Resolution::File,
            palette: Palette::default(),
            debug: false,
        }
    }
}

impl Config {
    /// Overlay a palette loaded from a TOML file on top of the defaults.
    pub fn load_palette_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        let raw: RawPalette = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid palette file {}: {e}", path.display())))?;
        self.palette = raw.into_palette(&self.palette);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawHalfPalette {
    package_name: Option<String>,
    package_background: Option<String>,
    file_name: Option<String>,
    file_background: Option<String>,
    import_arrow: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPalette {
    base: Option<RawHalfPalette>,
    cycle: Option<RawHalfPalette>,
}

impl RawPalette {
    fn into_palette(self, defaults: &Palette) -> Palette {
        Palette {
            base: merge_half(self.base, &defaults.base),
            cycle: merge_half(self.cycle, &defaults.cycle),
        }
    }
}

fn merge_half(raw: Option<RawHalfPalette>, default: &HalfPalette) -> HalfPalette {
    let Some(raw) = raw else {
        return default.clone();
    };
    HalfPalette {
        package_name: raw
            .package_name
            .map(Color)
            .unwrap_or_else(|| default.package_name.clone()),
        package_background: raw
            .package_background
            .map(Color)
            .unwrap_or_else(|| default.package_background.clone()),
        file_name: raw
            .file_name
            .map(Color)
            .unwrap_or_else(|| default.file_name.clone()),
        file_background: raw
            .file_background
            .map(Color)
            .unwrap_or_else(|| default.file_background.clone()),
        import_arrow: raw
            .import_arrow
            .map(Color)
            .unwrap_or_else(|| default.import_arrow.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolution_parses_known_values() {
        assert_eq!("file".parse::<Resolution>().unwrap(), Resolution::File);
        assert_eq!("package".parse::<Resolution>().unwrap(), Resolution::Package);
        assert!("bogus".parse::<Resolution>().is_err());
    }

    #[test]
    fn palette_override_merges_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("palette.toml");
        fs::write(
            &path,
            r#"
            [cycle]
            package_background = "#ff0000"
            "#,
        )
        .unwrap();

        let mut cfg = Config::default();
        cfg.load_palette_file(&path).unwrap();
        assert_eq!(cfg.palette.cycle.package_background.hex(), "#ff0000");
        // untouched fields keep the default.
        assert_eq!(
            cfg.palette.cycle.file_background.hex(),
            Palette::default().cycle.file_background.hex()
        );
        assert_eq!(
            cfg.palette.base.package_background.hex(),
            Palette::default().base.package_background.hex()
        );
    }
}
