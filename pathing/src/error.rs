use thiserror::Error;

/// Errors raised while turning an image or a text picture into a [`crate::GridMap`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("cell size must be at least one pixel")]
    ZeroCellSize,

    #[error("a {width}x{height} image does not fit a single {cell_size}px cell")]
    ImageTooSmall {
        width: u32,
        height: u32,
        cell_size: u32,
    },

    #[error("pixel block at ({x}, {y}) of size {size} lies outside the {width}x{height} image")]
    BlockOutOfBounds {
        x: u32,
        y: u32,
        size: u32,
        width: u32,
        height: u32,
    },

    #[error("expected {expected} bytes of RGBA data, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("{rows}x{columns} map needs {} cells, got {actual}", .rows * .columns)]
    CellCount {
        rows: usize,
        columns: usize,
        actual: usize,
    },

    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unknown map symbol {symbol:?} at row {row}, column {col}")]
    UnknownSymbol { symbol: char, row: usize, col: usize },
}
