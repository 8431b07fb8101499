//! CODABLOCK F (AIM ISS-X-24), Code 128 rows stacked into a block.
//!
//! Every row is `start, code set, row indicator, data.., check, stop`. The
//! last row carries the two data check characters K1 and K2 in front of its
//! row check. Planning the rows happens up front in [columns_to_rows], which
//! decides for every input character which code set it goes in and where
//! rows end.

use crate::content::{ct_cpy, Segment};
use crate::error::{ErrorKind, Result, Warning};
use crate::errtxt::{errtxt, errtxt_cw_dump, errtxtf, Arg, DEBUG_PRINT};
use crate::symbol::{OutputOptions, Symbol};

/// Code 128 character encodation (Table 1), bar/space widths.
const C128_TABLE: [&[u8]; 107] = [
    b"212222", b"222122", b"222221", b"121223", b"121322", b"131222", b"122213", b"122312", b"132212",
    b"221213", b"221312", b"231212", b"112232", b"122132", b"122231", b"113222", b"123122", b"123221",
    b"223211", b"221132", b"221231", b"213212", b"223112", b"312131", b"311222", b"321122", b"321221",
    b"312212", b"322112", b"322211", b"212123", b"212321", b"232121", b"111323", b"131123", b"131321",
    b"112313", b"132113", b"132311", b"211313", b"231113", b"231311", b"112133", b"112331", b"132131",
    b"113123", b"113321", b"133121", b"313121", b"211331", b"231131", b"213113", b"213311", b"213131",
    b"311123", b"311321", b"331121", b"312113", b"312311", b"332111", b"314111", b"221411", b"431111",
    b"111224", b"111422", b"121124", b"121421", b"141122", b"141221", b"112214", b"112412", b"122114",
    b"122411", b"142112", b"142211", b"241211", b"221114", b"413111", b"241112", b"134111", b"111242",
    b"121142", b"121241", b"114212", b"124112", b"124211", b"411212", b"421112", b"421211", b"212141",
    b"214121", b"412121", b"111143", b"111341", b"131141", b"114113", b"114311", b"411113", b"411311",
    b"113141", b"114131", b"311141", b"411131", b"211412", b"211214", b"211232", b"2331112",
];

// Code set flags, also marking row ends, fill and shift in the plan.
const CODE_A: u16 = 0x01;
const CODE_B: u16 = 0x02;
const CODE_C: u16 = 0x04;
const ROW_END: u16 = 0x08;
const SHIFT: u16 = 0x10;
const FILL: u16 = 0x20;
const CODE_FNC4: u16 = 0x80;
const NUMERIC: u16 = CODE_A | CODE_B | CODE_C;
const SETS: u16 = CODE_A | CODE_B | CODE_C;

// Function characters in the prepared data, above the 7-bit range.
const FNC3: u8 = 130;
const FNC4: u8 = 131;
const TO_A: u8 = 132;
const TO_B: u8 = 133;
const TO_C: u8 = 134;
const SHIFT_CHAR: u8 = 135;

const START_A: u8 = 103;
const STOP: u8 = 106;

pub const MAX_ROWS: usize = 44;
/// Data columns excluding start, code set, row indicator, check and stop.
const MIN_DATA_COLUMNS: usize = 4;
const MAX_DATA_COLUMNS: usize = 62;

/// Which code sets can hold a character, and how far each set reaches from
/// it.
#[derive(Debug, Clone, Copy, Default)]
struct Reach {
    sets: u16,
    a_following: usize,
    b_following: usize,
    /// Characters encodable in code C starting here.
    c_following: usize,
}

fn possible_sets(c: u8) -> u16 {
    match c {
        0x00..=0x1F => CODE_A,
        b'0'..=b'9' => NUMERIC,
        FNC4 => CODE_A | CODE_B | CODE_FNC4,
        0x60..=0x7F => CODE_B,
        _ => CODE_A | CODE_B,
    }
}

fn reach_table(data: &[u8]) -> Vec<Reach> {
    let mut table = vec![Reach::default(); data.len()];

    // backwards for the A and B runs
    let (mut next_a, mut next_b) = (0, 0);
    for (reach, &c) in table.iter_mut().zip(data).rev() {
        reach.sets = possible_sets(c);
        reach.a_following = if reach.sets & CODE_A != 0 { next_a + 1 } else { 0 };
        reach.b_following = if reach.sets & CODE_B != 0 { next_b + 1 } else { 0 };
        next_a = reach.a_following;
        next_b = reach.b_following;
    }

    // digit pairs
    for i in 0..data.len() {
        if table[i].sets & CODE_C == 0 {
            continue;
        }
        let mut run = i + 1;
        while run < data.len() && table[run - 1].sets == NUMERIC && table[run].sets == NUMERIC {
            table[i].c_following += 2;
            run += 2;
        }
    }

    table
}

/// Digits of the code C chain at `start` that fit in `empty` columns.
fn remaining_digits(table: &[Reach], start: usize, empty: isize) -> usize {
    let Some(reach) = table.get(start) else {
        return 0;
    };
    let pairs = (reach.c_following / 2).min(empty.max(0) as usize);
    pairs * 2
}

fn a_or_b(reach: &Reach) -> u16 {
    if reach.a_following > reach.b_following { CODE_A } else { CODE_B }
}

/// Row layout for a given number of data columns.
#[derive(Debug, Clone)]
struct Plan {
    rows: usize,
    data_columns: usize,
    /// Per input character: the code set switched to there, plus the
    /// row end, fill and shift markers.
    sets: Vec<u16>,
    fillings: usize,
}

/// Plan the rows for `data_columns` columns, widening while more than 44
/// rows result.
fn columns_to_rows(table: &[Reach], mut data_columns: usize) -> Option<Plan> {
    let len = table.len();
    loop {
        let mut sets = vec![0u16; len];
        let mut rows = 0;
        let mut cur = 0;
        let mut empty: isize;

        loop {
            empty = data_columns as isize;
            let mut set = a_or_b(&table[cur]);
            sets[cur] = set;

            // start in C when 4 digits fit and an odd start finds no more
            let pairs = remaining_digits(table, cur, empty);
            if pairs >= 4 && pairs >= remaining_digits(table, cur + 1, empty - 1) {
                set = CODE_C;
                sets[cur] = set;
                cur += 1;
            }
            cur += 1;
            empty -= 1;

            while empty > 0 && cur < len {
                let reach = table[cur];
                let fnc4 = reach.sets & CODE_FNC4 != 0;
                if set == CODE_C {
                    if reach.c_following > 0 {
                        cur += 2;
                        empty -= 1;
                    } else if empty == 1 {
                        sets[cur - 1] |= ROW_END | FILL;
                        empty = 0;
                    } else {
                        set = a_or_b(&reach);
                        sets[cur] = set;
                        empty -= 2;
                        cur += 1;
                    }
                    continue;
                }

                let pairs = remaining_digits(table, cur, empty - 1);
                if reach.sets == NUMERIC && pairs >= 4 && pairs > remaining_digits(table, cur + 1, empty - 2) {
                    set = CODE_C;
                    sets[cur] = set;
                    cur += 2;
                    empty -= 2;
                    continue;
                }

                let (following, other, other_set) = if set == CODE_A {
                    (reach.a_following, reach.b_following, CODE_B)
                } else {
                    (reach.b_following, reach.a_following, CODE_A)
                };
                if following == 0 || (fnc4 && following == 1) {
                    // must leave the current set
                    if empty == 1 || (fnc4 && empty == 2) {
                        sets[cur - 1] |= ROW_END | FILL;
                        empty = 0;
                    } else {
                        if other == 1 || (fnc4 && other == 2) {
                            // FNC4 goes before the shift
                            if fnc4 {
                                empty -= 1;
                                cur += 1;
                            }
                            sets[cur] |= SHIFT;
                        } else {
                            sets[cur] |= other_set;
                            set = other_set;
                        }
                        empty -= 2;
                        cur += 1;
                    }
                } else if fnc4 && empty == 1 {
                    // extended character does not fit on this row
                    sets[cur - 1] |= ROW_END | FILL;
                    empty = 0;
                } else {
                    empty -= 1;
                    cur += 1;
                }
            }

            sets[cur - 1] |= ROW_END;
            rows += 1;
            if cur >= len {
                break;
            }
        }

        // room for K1 and K2
        let mut fillings = match empty {
            0 | 1 => {
                if empty == 1 {
                    sets[cur - 1] |= FILL;
                }
                rows += 1;
                (data_columns as isize - 2 + empty) as usize
            }
            2 => 0,
            _ => {
                sets[cur - 1] |= FILL;
                (empty - 2).max(0) as usize
            }
        };

        if rows > MAX_ROWS {
            data_columns += 1;
            if data_columns > MAX_DATA_COLUMNS {
                return None;
            }
            continue;
        }
        if rows == 1 {
            rows = 2;
            fillings += data_columns;
        }
        return Some(Plan { rows, data_columns, sets, fillings });
    }
}

/// Narrowest plan within `rows_requested` rows, padding with empty rows up
/// to the requested count.
fn rows_to_columns(table: &[Reach], rows_requested: usize, columns_requested: Option<usize>) -> Option<Plan> {
    let mut test_columns = columns_requested
        .unwrap_or_else(|| (table.len() / rows_requested).clamp(MIN_DATA_COLUMNS, MAX_DATA_COLUMNS));
    let mut tested = Vec::new();

    loop {
        tested.push(test_columns);
        let mut plan = columns_to_rows(table, test_columns)?;
        if plan.rows <= rows_requested {
            let narrowest = plan.rows == 2
                || test_columns == MIN_DATA_COLUMNS
                || Some(test_columns) == columns_requested
                || tested.contains(&(test_columns - 1));
            if narrowest {
                if plan.rows < rows_requested {
                    plan.fillings += plan.data_columns * (rows_requested - plan.rows);
                    plan.rows = rows_requested;
                }
                return Some(plan);
            }
            test_columns -= 1;
        } else {
            test_columns += 1;
            if test_columns > MAX_DATA_COLUMNS {
                return None;
            }
        }
    }
}

fn in_set_a(c: u8) -> u8 {
    match c {
        TO_B => 100,
        FNC4 => 101,
        FNC3 => 96,
        TO_C => 99,
        SHIFT_CHAR => 98,
        b' '..=b'_' => c - b' ',
        _ => c + 64,
    }
}

fn in_set_b(c: u8) -> u8 {
    match c {
        FNC3 => 96,
        FNC4 => 100,
        TO_A => 101,
        TO_C => 99,
        SHIFT_CHAR => 98,
        _ => c - b' ',
    }
}

fn in_set_c(c1: u8, c2: u8) -> u8 {
    match c1 {
        TO_B => 100,
        TO_A => 101,
        _ => 10 * (c1 - b'0') + (c2 - b'0'),
    }
}

fn in_set(set: u16, c: u8) -> u8 {
    match set {
        CODE_A => in_set_a(c),
        CODE_B => in_set_b(c),
        _ => in_set_c(c, 0),
    }
}

/// Row indicators and K1/K2 (Tables D.2, D.3 and F.1).
fn value_char(value: usize, set: u16) -> u8 {
    let value = value as u8;
    if set == CODE_C {
        return in_set_c(b'0' + value / 10, b'0' + value % 10);
    }
    match value {
        0..=31 => in_set_b(value + 96),
        32..=47 => in_set_b(value),
        _ => in_set_b(value + 10),
    }
}

/// Fill the rest of a row alternating between code C and B.
fn fill_row(row: &mut Vec<u8>, set: &mut u16, mut empty: isize) {
    while empty > 0 {
        match *set {
            CODE_C => {
                row.push(in_set_c(TO_B, 0));
                *set = CODE_B;
            }
            CODE_B => {
                row.push(in_set_b(TO_C));
                *set = CODE_C;
            }
            _ => {
                row.push(in_set_a(TO_C));
                *set = CODE_C;
            }
        }
        empty -= 1;
    }
}

/// Data check characters K1 and K2 (Annex F) over the original input.
fn data_checks(source: &[u8]) -> (usize, usize) {
    source.iter().enumerate().fold((0, 0), |(k1, k2), (i, &c)| {
        ((k1 + (i + 1) * c as usize) % 86, (k2 + i * c as usize) % 86)
    })
}

/// Code 128 values of every row, start to stop.
fn build_rows(data: &[u8], plan: &Plan, checks: (usize, usize)) -> Vec<Vec<u8>> {
    let Plan { rows, data_columns, ref sets, .. } = *plan;
    let columns = data_columns + 5;
    let mut out = Vec::with_capacity(rows);
    let mut cur = 0;

    for row_index in 0..rows {
        let last = row_index == rows - 1;
        let mut row = Vec::with_capacity(columns);
        let mut set;

        if cur >= data.len() {
            // padding row
            row.extend([START_A, 100]);
            set = CODE_B;
            row.push(value_char(row_index + 42, set));
            let empty = data_columns as isize - if last { 2 } else { 0 };
            fill_row(&mut row, &mut set, empty);
        } else {
            set = sets[cur] & SETS;
            let start = match set {
                CODE_A => 98,
                CODE_B => 100,
                _ => {
                    set = CODE_C;
                    99
                }
            };
            row.extend([START_A, start]);
            // the first row indicator holds the row count instead
            let indicator = if row_index == 0 { rows - 2 } else { row_index + 42 };
            row.push(value_char(indicator, set));

            let mut empty = data_columns as isize;
            while empty > 0 && cur < data.len() {
                if empty < data_columns as isize {
                    for (flag, to) in [(CODE_A, TO_A), (CODE_B, TO_B), (CODE_C, TO_C)] {
                        if sets[cur] & flag != 0 {
                            row.push(in_set(set, to));
                            empty -= 1;
                            set = flag;
                            break;
                        }
                    }
                }

                if sets[cur] & SHIFT != 0 {
                    row.push(in_set(set, SHIFT_CHAR));
                    empty -= 2;
                    let shifted = if set == CODE_B { CODE_A } else { CODE_B };
                    row.push(in_set(shifted, data[cur]));
                } else {
                    if set == CODE_C {
                        let next = data.get(cur + 1).copied().unwrap_or(b'0');
                        row.push(in_set_c(data[cur], next));
                        cur += 1;
                    } else {
                        row.push(in_set(set, data[cur]));
                    }
                    empty -= 1;
                }

                if sets[cur] & (FILL | ROW_END) != 0 {
                    if last {
                        empty -= 2;
                    }
                    fill_row(&mut row, &mut set, empty);
                    empty = 0;
                }
                cur += 1;
            }
        }

        if last {
            row.push(value_char(checks.0, set));
            row.push(value_char(checks.1, set));
        }
        let check = row[1..data_columns + 3]
            .iter()
            .enumerate()
            .fold(row[0] as usize % 103, |sum, (i, &v)| (sum + v as usize * (i + 1)) % 103);
        row.push(check as u8);
        row.push(STOP);
        out.push(row);
    }

    out
}

/// Encode `segs[0]` as CODABLOCK F. `option_1` fixes the row count,
/// `option_2` the total column count.
pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>> {
    let source = segs.first().map_or(&[][..], |seg| &seg.source[..]);

    let rows_requested = symbol.option_1;
    if rows_requested == 1 || rows_requested > MAX_ROWS as i32 {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 410,
            "Number of rows '%d' out of range (0, 2 to 44)", &[Arg::Int(rows_requested as i64)]));
    }
    let columns_requested = symbol.option_2;
    if columns_requested > 0 && !(9..=67).contains(&columns_requested) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 411,
            "Number of columns '%d' out of range (9 to 67)", &[Arg::Int(columns_requested as i64)]));
    }

    let mut data = Vec::with_capacity(source.len() * 2 + 1);
    if symbol.output_options.contains(OutputOptions::READER_INIT) {
        data.push(FNC3);
    }
    for &c in source {
        if c > 127 {
            data.extend([FNC4, c & 127]);
        } else {
            data.push(c);
        }
    }
    let table = reach_table(&data);

    let columns = if rows_requested <= 0 && columns_requested <= 0 {
        // square-ish
        ((data.len() as f64).sqrt() as usize + 5).clamp(9, 67)
    } else {
        columns_requested.max(0) as usize
    };
    let plan = if rows_requested > 0 {
        let requested = columns.checked_sub(5).filter(|&c| c >= MIN_DATA_COLUMNS);
        rows_to_columns(&table, rows_requested as usize, requested)
    } else {
        columns_to_rows(&table, columns - 5)
    };
    let Some(plan) = plan else {
        return Err(errtxt(ErrorKind::TooLong, symbol, 413, "Input too long, requires more than 44 rows"));
    };

    let checks = data_checks(source);
    let rows = build_rows(&data, &plan, checks);
    if symbol.debug & DEBUG_PRINT != 0 {
        log::debug!("CODABLOCK F rows {}, columns {}, fillings {}, K1 {}, K2 {}",
            plan.rows, plan.data_columns + 5, plan.fillings, checks.0, checks.1);
        for row in &rows {
            log::debug!("  {:?}", row);
        }
    }
    errtxt_cw_dump(symbol, &rows.iter().flatten().map(|&v| v as u32).collect::<Vec<_>>());

    for row in &rows {
        let pattern: Vec<u8> = row.iter().flat_map(|&v| C128_TABLE[v as usize].iter().copied()).collect();
        symbol.expand(&pattern);
    }

    let warning = if symbol.output_options.contains(OutputOptions::COMPLIANT_HEIGHT) {
        let min_row_height = (0.55 * plan.data_columns as f32 + 3.0).max(8.0);
        symbol.set_height(min_row_height, min_row_height.max(10.0) * plan.rows as f32, 0.0, false)
    } else {
        symbol.set_height(0.0, 10.0 * plan.rows as f32, 0.0, true);
        None
    };

    symbol.output_options.insert(OutputOptions::BIND);
    if symbol.border_width == 0 {
        symbol.border_width = 1;
    }

    if symbol.output_options.contains(OutputOptions::CONTENT_SEGS) {
        ct_cpy(symbol, source);
    }

    Ok(warning)
}
