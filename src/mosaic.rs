use log::debug;

use crate::averager::{PatchGrid, PatchSize, mean_color};
use crate::image::ImageBuffer;
use crate::palette::Palette;

/// Matched palette indices for every patch, one inner `Vec` per grid row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mosaic {
    columns: usize,
    rows: Vec<Vec<usize>>,
}

impl Mosaic {
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    /// `(row, column, color_index)` in emission order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, &color)| (r, c, color))
        })
    }
}

fn compute_row(
    image: &ImageBuffer,
    grid: &PatchGrid,
    palette: &Palette,
    row: usize,
) -> Vec<usize> {
    grid.row(row)
        .map(|patch| palette.best_match(mean_color(image, &patch)))
        .collect()
}

pub fn compute_mosaic(image: &ImageBuffer, size: PatchSize, palette: &Palette) -> Mosaic {
    let grid = PatchGrid::new(image, size);
    debug!(
        "Computing {}x{} mosaic for {}x{} image",
        grid.columns(),
        grid.rows(),
        image.width(),
        image.height()
    );
    let rows = (0..grid.rows())
        .map(|row| compute_row(image, &grid, palette, row))
        .collect();
    Mosaic {
        columns: grid.columns(),
        rows,
    }
}

/// Same result as [`compute_mosaic`], with grid rows computed on the rayon
/// pool. `collect` on an indexed parallel iterator keeps row order.
#[cfg(feature = "parallel")]
pub fn compute_mosaic_parallel(
    image: &ImageBuffer,
    size: PatchSize,
    palette: &Palette,
) -> Mosaic {
    use rayon::prelude::*;

    let grid = PatchGrid::new(image, size);
    debug!(
        "Computing {}x{} mosaic for {}x{} image on {} threads",
        grid.columns(),
        grid.rows(),
        image.width(),
        image.height(),
        rayon::current_num_threads()
    );
    let rows = (0..grid.rows())
        .into_par_iter()
        .map(|row| compute_row(image, &grid, palette, row))
        .collect();
    Mosaic {
        columns: grid.columns(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> ImageBuffer {
        let mut bytes = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                bytes.extend_from_slice(&[
                    (x * 7 % 256) as u8,
                    (y * 13 % 256) as u8,
                    ((x + y) % 256) as u8,
                ]);
            }
        }
        ImageBuffer::from_raw(width, height, 3, (width * 3) as usize, bytes).unwrap()
    }

    #[test]
    fn test_cells_follow_raster_order() {
        let image = gradient(23, 20);
        let mosaic = compute_mosaic(&image, PatchSize::default(), &Palette::default());
        assert_eq!(mosaic.columns(), 5);
        assert_eq!(mosaic.row_count(), 3);

        let coords: Vec<(usize, usize)> = mosaic.cells().map(|(r, c, _)| (r, c)).collect();
        let expected: Vec<(usize, usize)> =
            (0..3).flat_map(|r| (0..5).map(move |c| (r, c))).collect();
        assert_eq!(coords, expected);
    }

    #[test]
    fn test_recomputing_is_idempotent() {
        let image = gradient(64, 48);
        let palette = Palette::default();
        let first = compute_mosaic(&image, PatchSize::default(), &palette);
        let second = compute_mosaic(&image, PatchSize::default(), &palette);
        assert_eq!(first, second);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let image = gradient(131, 97);
        let palette = Palette::default();
        for size in [
            PatchSize::default(),
            PatchSize::new(1, 1).unwrap(),
            PatchSize::new(8, 3).unwrap(),
        ] {
            assert_eq!(
                compute_mosaic(&image, size, &palette),
                compute_mosaic_parallel(&image, size, &palette)
            );
        }
    }
}
