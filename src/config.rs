use crate::calendar::Granularity;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User preferences, loaded once at startup and handed to the views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub dark_mode: bool,
    /// Last calendar zoom level the user picked.
    pub granularity: Granularity,
    /// Seconds between background snapshot refreshes in the TUI.
    pub refresh_secs: u64,
    pub calendar: CalendarConfig,
}

/// Geometry constants for the timeline bars and the pie chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Length of the reference workday single-day bars are scaled against.
    pub reference_day_minutes: u32,
    pub min_bar_percent: f64,
    pub max_visible_bars: usize,
    /// Vertical offset of the first bar, in pixels.
    pub bar_base_offset: u32,
    pub bar_height: u32,
    pub completed_opacity: f32,
    pub pending_opacity: f32,
    pub pie: PieGeometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// Radius of the donut hole.
    pub inner_radius: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            dark_mode: false,
            granularity: Granularity::Month,
            refresh_secs: 5,
            calendar: CalendarConfig::default(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        CalendarConfig {
            reference_day_minutes: 12 * 60,
            min_bar_percent: 20.0,
            max_visible_bars: 4,
            bar_base_offset: 20,
            bar_height: 16,
            completed_opacity: 0.6,
            pending_opacity: 0.9,
            pie: PieGeometry::default(),
        }
    }
}

impl Default for PieGeometry {
    fn default() -> Self {
        PieGeometry {
            center_x: 100.0,
            center_y: 100.0,
            radius: 80.0,
            inner_radius: 45.0,
        }
    }
}

pub fn preferences_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "taskgrid").context("locating config directory")?;
    Ok(dirs.config_dir().join("config.yml"))
}

/// Missing file means defaults; a malformed one is an error.
pub fn load_preferences(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no preferences file, using defaults");
        return Ok(Preferences::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let prefs = serde_yaml::from_str(&data).context("parsing preferences")?;
    Ok(prefs)
}

pub fn save_preferences(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(prefs).context("serializing preferences")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    tracing::debug!(path = %path.display(), "saved preferences");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = load_preferences(&dir.path().join("config.yml")).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.calendar.max_visible_bars, 4);
        assert_eq!(prefs.calendar.reference_day_minutes, 720);
        assert_eq!(prefs.calendar.pie.radius, 80.0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "dark_mode: true\ngranularity: week\ncalendar:\n  max_visible_bars: 2\n",
        )
        .unwrap();
        let prefs = load_preferences(&path).unwrap();
        assert!(prefs.dark_mode);
        assert_eq!(prefs.granularity, Granularity::Week);
        assert_eq!(prefs.calendar.max_visible_bars, 2);
        assert_eq!(prefs.calendar.bar_height, 16);
        assert_eq!(prefs.refresh_secs, 5);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yml");
        let prefs = Preferences {
            dark_mode: true,
            granularity: Granularity::Day,
            ..Preferences::default()
        };
        save_preferences(&path, &prefs).unwrap();
        assert_eq!(load_preferences(&path).unwrap(), prefs);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "granularity: fortnight\n").unwrap();
        assert!(load_preferences(&path).is_err());
    }
}
