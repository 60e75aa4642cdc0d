//! Image export for the occupancy grid.

use super::OccupancyGrid;
use crate::error::Result;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

impl OccupancyGrid {
    /// Render as RGB: unhit cells white, saturated cells black, marker red
    pub fn to_image(&self) -> RgbImage {
        let size = self.size() as u32;
        let max_val = self.max_val();
        let marker = self.marker_value();
        let scale = 255.0 / max_val as f32;

        RgbImage::from_fn(size, size, |col, row| {
            let cell = self.cells[row as usize * self.size() + col as usize];
            if cell >= marker {
                Rgb([255, 0, 0])
            } else {
                let gray = (scale * max_val.saturating_sub(cell) as f32) as u8;
                Rgb([gray, gray, gray])
            }
        })
    }

    /// File name of the exported map, keyed by resolution
    pub fn image_file_name(&self) -> String {
        format!("{}_pixels_per_meter.png", self.px_per_m())
    }

    /// Write the map image into `dir`, returns the written path
    pub fn save_image(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.image_file_name());
        self.to_image().save(&path)?;
        log::info!("Map image saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::super::DrawReport;
    use super::*;
    use crate::config::MapConfig;
    use crate::localization::Pose;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(&MapConfig {
            room_radius_m: 0.5,
            px_per_m: 10,
            ..MapConfig::default()
        })
    }

    #[test]
    fn test_image_colours() {
        let mut grid = grid();
        for _ in 0..10 {
            grid.increment(0, 0);
        }
        for _ in 0..4 {
            grid.increment(1, 0);
        }
        grid.stamp_footprint(&Pose::default(), &mut DrawReport::default());

        let image = grid.to_image();
        assert_eq!(image.dimensions(), (11, 11));
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
        // 255 / 10 * 6 = 153
        assert_eq!(image.get_pixel(1, 0), &Rgb([153, 153, 153]));
        assert_eq!(image.get_pixel(10, 10), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(5, 5), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_save_image() {
        let grid = grid();
        let dir = std::env::temp_dir().join("rover_station_export_test");
        let path = grid.save_image(&dir).unwrap();

        assert_eq!(path.file_name().unwrap(), "10_pixels_per_meter.png");
        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded.dimensions(), (11, 11));
        std::fs::remove_file(&path).ok();
    }
}
