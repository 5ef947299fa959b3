mod galois;

use galois::{EXP_TABLE, GENERATOR_POLYNOMIALS, LOG_TABLE};

// Reed-Solomon encoder
//------------------------------------------------------------------------------

// Largest block admitted by RS over GF(256)
pub static MAX_BLOCK_SIZE: usize = 255;

// Computes ec codewords for a data block by polynomial long division of
// data * x^ecc_count by the generator polynomial of matching degree. The
// remainder coefficients, high degree first, are the ec codewords.
pub fn ecc(block: &[u8], ecc_count: usize) -> Vec<u8> {
    let len = block.len();
    debug_assert!(len + ecc_count <= MAX_BLOCK_SIZE, "Block exceeds GF(256) limit: {len}");

    let gen_poly = GENERATOR_POLYNOMIALS[ecc_count];
    debug_assert!(!gen_poly.is_empty(), "No generator polynomial of degree {ecc_count}");

    let mut res = block.to_vec();
    res.resize(len + ecc_count, 0);

    for i in 0..len {
        let lead_coeff = res[i] as usize;
        if lead_coeff == 0 {
            continue;
        }

        let log_lead_coeff = LOG_TABLE[lead_coeff] as usize;
        for (u, v) in res[i + 1..].iter_mut().zip(gen_poly.iter()) {
            let mut log_sum = *v as usize + log_lead_coeff;
            if log_sum >= 255 {
                log_sum -= 255;
            }
            *u ^= EXP_TABLE[log_sum];
        }
    }

    res.split_off(len)
}
