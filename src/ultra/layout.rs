//! Folding the final codeword sequence into the colour module grid.
//!
//! Every codeword is a tile of 5 vertically stacked modules. Tiles fill a
//! row block top to bottom, column by column, with a white/black separator
//! row between row blocks. Column 2 holds the two data column count tiles,
//! centred on the middle row.

use crate::symbol::{Colour, Symbol};

/// Separator between the error correction and the data regions.
pub const SEPARATOR: u16 = 283;
/// Padding to fill the last column.
pub const PAD: u16 = 284;

const TILE_COUNT: usize = 285;

/// Colours tiles are built from, in tile enumeration order.
const TILE_COLOURS: [u16; 4] = [Colour::Cyan as u16, Colour::Magenta as u16, Colour::Yellow as u16, Colour::Green as u16];

/// Patterns left out of the codeword tiles.
const EXCLUDED_TILES: [u16; 5] = [0o15156, 0o16163, 0o31616, 0o36161, 0o61613];

/// Largest `total - 6` fitting 2, 3 and 4 rows.
const MAX_SIZES: [usize; 3] = [37, 84, 161];
/// Column count encoded by data column count tile 0, for 2 to 5 rows.
const MIN_COLUMNS: [usize; 4] = [5, 13, 22, 29];
/// A clock column follows every 15 data columns.
const CLOCK_SPACING: usize = 15;

/// Upper data column count tiles.
const DCC_UPPER: [u16; 32] = [
    0o51363, 0o51563, 0o51653, 0o53153, 0o53163, 0o53513, 0o53563, 0o53613,
    0o53653, 0o56153, 0o56163, 0o56313, 0o56353, 0o56363, 0o56513, 0o56563,
    0o51316, 0o51356, 0o51536, 0o51616, 0o53156, 0o53516, 0o53536, 0o53616,
    0o53636, 0o53656, 0o56136, 0o56156, 0o56316, 0o56356, 0o56516, 0o56536,
];

/// Lower data column count tiles.
const DCC_LOWER: [u16; 32] = [
    0o61351, 0o61361, 0o61531, 0o61561, 0o61631, 0o61651, 0o63131, 0o63151,
    0o63161, 0o63531, 0o63561, 0o63631, 0o65131, 0o65161, 0o65351, 0o65631,
    0o31351, 0o31361, 0o31531, 0o31561, 0o31631, 0o31651, 0o35131, 0o35151,
    0o35161, 0o35361, 0o35631, 0o35651, 0o36131, 0o36151, 0o36351, 0o36531,
];

const fn is_excluded(tile: u16) -> bool {
    let mut i = 0;
    while i < EXCLUDED_TILES.len() {
        if EXCLUDED_TILES[i] == tile {
            return true;
        }
        i += 1;
    }
    false
}

/// Tiles in ascending colour order: no two adjacent modules alike and no
/// colour used more than twice. The separator and pad tiles break the
/// second rule so they can never be mistaken for data.
const fn build_tiles() -> [u16; TILE_COUNT] {
    let mut tiles = [0u16; TILE_COUNT];
    let mut count = 0;
    let mut n: usize = 0;
    while n < 1024 && count < SEPARATOR as usize {
        let mut tile = 0u16;
        let mut uses = [0u8; 4];
        let mut prev = usize::MAX;
        let mut valid = true;
        let mut i = 0;
        while i < 5 {
            let digit = (n >> (2 * (4 - i))) & 3;
            if digit == prev {
                valid = false;
            }
            uses[digit] += 1;
            if uses[digit] > 2 {
                valid = false;
            }
            tile = tile * 8 + TILE_COLOURS[digit];
            prev = digit;
            i += 1;
        }
        if valid && !is_excluded(tile) {
            tiles[count] = tile;
            count += 1;
        }
        n += 1;
    }
    tiles[SEPARATOR as usize] = 0o56565;
    tiles[PAD as usize] = 0o51515;
    tiles
}

/// Colour of each module of a tile, top module in the highest octal digit.
const TILES: [u16; TILE_COUNT] = build_tiles();

fn modules(pattern: u16) -> [Colour; 5] {
    core::array::from_fn(|j| Colour::from_index(((pattern >> (3 * (4 - j))) & 7) as u8).unwrap_or(Colour::White))
}

/// Symbol size for a codeword count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Row blocks.
    pub rows: usize,
    /// Codeword columns.
    pub data_columns: usize,
    /// Codeword columns plus clock columns.
    pub columns: usize,
}

impl Dimensions {
    /// Fewest rows holding `total` codewords.
    pub fn for_total(total: usize) -> Self {
        let rows = 5 - MAX_SIZES.iter().filter(|&&max| total.saturating_sub(6) <= max).count();
        let data_columns = total.div_ceil(rows);
        let columns = data_columns + data_columns / CLOCK_SPACING;
        Self { rows, data_columns, columns }
    }

    /// Slots in the grid, filled with pads past the real codewords.
    pub fn capacity(&self) -> usize {
        self.rows * self.data_columns
    }

    pub fn height(&self) -> usize {
        self.rows * 6 + 1
    }

    pub fn width(&self) -> usize {
        self.columns + 6
    }

    /// Index of the data column count tiles.
    pub fn dcc(&self) -> usize {
        self.columns - MIN_COLUMNS[self.rows - 2]
    }

    fn is_clock(&self, column: usize) -> bool {
        column % (CLOCK_SPACING + 1) == CLOCK_SPACING - 1
    }
}

/// Draw `codewords`, already padded to the capacity, into `symbol`.
/// Revision 2 swaps the upper and lower data column count tiles.
pub fn place(symbol: &mut Symbol, dims: &Dimensions, codewords: &[u16], revision: i32) {
    debug_assert_eq!(codewords.len(), dims.capacity());
    let height = dims.height();
    let width = dims.width();
    let clock = |y: usize| if y % 2 == 1 { Colour::White } else { Colour::Black };

    for y in 0..height {
        for x in 0..width {
            let colour = if y == 0 || y == height - 1 || x == 0 || x == width - 1 {
                Colour::Black
            } else if x == 1 {
                clock(y)
            } else if y % 6 == 0 {
                if x % 2 == 0 { Colour::White } else { Colour::Black }
            } else if x == 3 {
                Colour::Black
            } else if x >= 5 && dims.is_clock(x - 5) {
                clock(y)
            } else {
                Colour::White
            };
            symbol.set_module_colour(y, x, colour);
        }
    }

    let (upper, lower) = match revision {
        2 => (DCC_LOWER, DCC_UPPER),
        _ => (DCC_UPPER, DCC_LOWER),
    };
    let middle = (height - 1) / 2;
    draw_tile(symbol, 2, middle - 5, upper[dims.dcc()]);
    draw_tile(symbol, 2, middle + 1, lower[dims.dcc()]);

    let data_x = (0..dims.columns).filter(|&c| !dims.is_clock(c)).map(|c| c + 5);
    for (x, column) in data_x.zip(codewords.chunks(dims.rows)) {
        for (block, &cw) in column.iter().enumerate() {
            draw_tile(symbol, x, block * 6 + 1, TILES[cw as usize]);
        }
    }

    symbol.rows = height;
    symbol.width = width;
}

fn draw_tile(symbol: &mut Symbol, x: usize, top: usize, pattern: u16) {
    for (j, colour) in modules(pattern).into_iter().enumerate() {
        symbol.set_module_colour(top + j, x, colour);
    }
}
