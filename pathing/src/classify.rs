use std::num::NonZeroU32;

use image::{GenericImageView, ImageBuffer, Pixel, Rgb, Rgba};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::GridError, Cell, GridMap};

/// Decides road or wall from the pixels of a block.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TerrainClassifier {
    /// Road when the mean of every channel lies in the closed interval `[low, high]`
    Band { low: f64, high: f64 },
    /// Road when the mean luminance is below `cutoff`, so dark streets on a light map
    LumaThreshold { cutoff: f64 },
}

impl TerrainClassifier {
    /// Band of `reference ± tolerance` on every channel
    pub fn around(reference: f64, tolerance: f64) -> Self {
        Self::Band {
            low: reference - tolerance,
            high: reference + tolerance,
        }
    }

    pub fn luma_below(cutoff: f64) -> Self {
        Self::LumaThreshold { cutoff }
    }

    pub fn classify<I>(&self, block: &PixelBlock<'_, I>) -> Cell
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let mut sums = [0u64; 3];
        let mut luma = 0u64;
        let mut count = 0u64;
        for pixel in block.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += u64::from(channel);
            }
            luma += u64::from(pixel.to_luma().0[0]);
            count += 1;
        }

        // a block always holds at least one pixel
        let count = count as f64;
        let road = match *self {
            TerrainClassifier::Band { low, high } => sums
                .iter()
                .all(|&sum| (low..=high).contains(&(sum as f64 / count))),
            TerrainClassifier::LumaThreshold { cutoff } => (luma as f64 / count) < cutoff,
        };
        if road {
            Cell::Road
        } else {
            Cell::Wall
        }
    }
}

impl Default for TerrainClassifier {
    /// The gray used for roads on the maps, 90 with a tolerance of 5
    fn default() -> Self {
        Self::around(90.0, 5.0)
    }
}

/// A square, non-empty window into an image
#[derive(Debug)]
pub struct PixelBlock<'a, I> {
    image: &'a I,
    x: u32,
    y: u32,
    size: NonZeroU32,
}

impl<'a, I> PixelBlock<'a, I>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    pub fn new(image: &'a I, x: u32, y: u32, size: u32) -> Result<Self, GridError> {
        let size = NonZeroU32::new(size).ok_or(GridError::ZeroCellSize)?;
        let (width, height) = image.dimensions();
        let fits = x
            .checked_add(size.get())
            .zip(y.checked_add(size.get()))
            .is_some_and(|(right, bottom)| right <= width && bottom <= height);
        if !fits {
            return Err(GridError::BlockOutOfBounds {
                x,
                y,
                size: size.get(),
                width,
                height,
            });
        }
        Ok(Self { image, x, y, size })
    }

    pub fn size(&self) -> u32 {
        self.size.get()
    }

    /// The RGB value of every pixel in the block, row by row. Alpha is dropped.
    pub fn pixels(&self) -> impl Iterator<Item = Rgb<u8>> + '_ {
        let size = self.size.get();
        (self.y..self.y + size).flat_map(move |y| {
            (self.x..self.x + size).map(move |x| self.image.get_pixel(x, y).to_rgb())
        })
    }
}

/// Split `image` into `cell_size` squares and classify each one.
///
/// Pixels to the right of or below the last whole cell are ignored.
pub fn build_grid<I>(
    image: &I,
    cell_size: u32,
    classifier: &TerrainClassifier,
) -> Result<GridMap, GridError>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    if cell_size == 0 {
        return Err(GridError::ZeroCellSize);
    }
    let (width, height) = image.dimensions();
    let columns = (width / cell_size) as usize;
    let rows = (height / cell_size) as usize;
    if columns == 0 || rows == 0 {
        return Err(GridError::ImageTooSmall {
            width,
            height,
            cell_size,
        });
    }

    let mut cells = Vec::with_capacity(rows * columns);
    for row in 0..rows {
        for col in 0..columns {
            let block = PixelBlock::new(
                image,
                col as u32 * cell_size,
                row as u32 * cell_size,
                cell_size,
            )?;
            cells.push(classifier.classify(&block));
        }
    }

    let map = GridMap::from_cells(rows, columns, cells)?;
    debug!(
        "built {}x{} grid from {}x{} image, {} road cells",
        columns,
        rows,
        width,
        height,
        map.road_cells().count()
    );
    Ok(map)
}

/// [`build_grid`] over a raw RGBA buffer, as handed out by a canvas
pub fn grid_from_rgba(
    buffer: &[u8],
    width: u32,
    height: u32,
    cell_size: u32,
    classifier: &TerrainClassifier,
) -> Result<GridMap, GridError> {
    let expected = width as usize * height as usize * 4;
    if buffer.len() != expected {
        return Err(GridError::BufferSize {
            expected,
            actual: buffer.len(),
        });
    }
    let image = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(width, height, buffer).ok_or(
        GridError::BufferSize {
            expected,
            actual: buffer.len(),
        },
    )?;
    build_grid(&image, cell_size, classifier)
}
