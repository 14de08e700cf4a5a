use std::path::{Path, PathBuf};

use time::Date;

pub const INPUT_FILE: &str = "bmkg_data_bandung.json";
pub const OUTPUT_DIR: &str = "output";
pub const TEMPERATURE_CHART: &str = "temperature_trends.png";
pub const RAINFALL_CHART: &str = "rainfall_patterns.png";

/// Where the pipeline reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Width and height of both charts, in pixels.
    pub chart_size: (u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(INPUT_FILE),
            output_dir: PathBuf::from(OUTPUT_DIR),
            chart_size: (1200, 600),
        }
    }
}

impl Config {
    /// The default layout, relative to `root` instead of the working directory.
    pub fn rooted_at(root: &Path) -> Self {
        let default = Self::default();
        Self {
            input: root.join(default.input),
            output_dir: root.join(default.output_dir),
            ..default
        }
    }

    /// The CSV export written on `day`; reruns on the same day overwrite it.
    pub fn export_path(&self, day: Date) -> PathBuf {
        self.output_dir.join(format!(
            "bmkg_data_{:04}{:02}{:02}.csv",
            day.year(),
            u8::from(day.month()),
            day.day()
        ))
    }

    pub fn temperature_chart(&self) -> PathBuf {
        self.output_dir.join(TEMPERATURE_CHART)
    }

    pub fn rainfall_chart(&self) -> PathBuf {
        self.output_dir.join(RAINFALL_CHART)
    }
}
