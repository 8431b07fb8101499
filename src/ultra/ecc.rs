//! Reed-Solomon error correction over the prime field GF(283).

/// Field size. Data and check codewords are all below it.
pub const GF: u16 = 283;

const fn build_tables() -> ([u16; 564], [u16; 283]) {
    let mut pwr = [0u16; 564];
    let mut log = [0u16; 283];
    let mut v: u32 = 1;
    let mut j = 0;
    while j < 282 {
        // stored twice so a sum of two logs never needs reducing
        pwr[j] = v as u16;
        pwr[j + 282] = v as u16;
        log[v as usize] = j as u16;
        v = v * 3 % 283;
        j += 1;
    }
    (pwr, log)
}

const TABLES: ([u16; 564], [u16; 283]) = build_tables();
/// Powers of the generator 3.
const GF_PWR: [u16; 564] = TABLES.0;
const GF_LOG: [u16; 283] = TABLES.1;

#[inline]
const fn gf_mul(a: u16, b: u16) -> u16 {
    if a == 0 || b == 0 {
        0
    } else {
        GF_PWR[(GF_LOG[a as usize] + GF_LOG[b as usize]) as usize]
    }
}

/// Divisor polynomial with roots 3^1..=3^n, coefficients alternately negated
/// as the encoder below expects them.
fn generator_poly(ecc_count: usize) -> Vec<u16> {
    let mut poly = vec![0u16; ecc_count + 1];
    poly[0] = 1;

    for i in 0..ecc_count {
        for j in (0..=i).rev() {
            poly[j + 1] = (poly[j] + gf_mul(poly[j + 1], GF_PWR[i + 1])) % GF;
        }
        poly[0] = gf_mul(poly[0], GF_PWR[i + 1]);
    }
    for i in (0..ecc_count).rev().step_by(2) {
        poly[i] = (GF - poly[i]) % GF;
    }

    poly
}

/// Fill the last `ecc_count` slots of `codewords` with the check codewords of
/// the data in front of them.
pub fn generate_ecc(codewords: &mut [u16], ecc_count: usize) {
    debug_assert!(codewords.len() >= ecc_count);
    if ecc_count == 0 || codewords.len() < ecc_count {
        return;
    }

    let poly = generator_poly(ecc_count);
    let (data, ecc) = codewords.split_at_mut(codewords.len() - ecc_count);
    ecc.fill(0);

    for cw in data {
        debug_assert!(*cw < GF, "codeword {} outside of GF(283)", cw);
        let t = (ecc[0] + *cw) % GF;

        for i in 0..ecc_count - 1 {
            ecc[i] = (ecc[i + 1] + GF - gf_mul(t, poly[ecc_count - 1 - i])) % GF;
        }
        ecc[ecc_count - 1] = (GF - gf_mul(t, poly[0])) % GF;
    }

    for e in ecc {
        *e = (GF - *e) % GF;
    }
}
