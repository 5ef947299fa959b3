pub use encode::*;

// Encoder
//------------------------------------------------------------------------------

pub mod encode {
    use std::mem::swap;

    use crate::common::codec::{Mode, Segment, MODES};
    use crate::common::error::{QRError, QRResult};
    use crate::common::metadata::{ECLevel, Version};
    use crate::common::BitStream;

    use super::writer::{pad_remaining_capacity, push_segment, push_terminator};

    // Encodes data at the smallest version admitting it, starting the search
    // at min_version. A preferred mode forces a single segment in that mode.
    pub fn encode(
        data: &[u8],
        ecl: ECLevel,
        min_version: usize,
        mode: Option<Mode>,
    ) -> QRResult<(BitStream, Version)> {
        let (ver, segs) = find_optimal_version_and_segments(data, ecl, min_version, mode)?;
        let bcap = ver.data_bit_capacity(ecl);
        let mut bs = BitStream::new(bcap);
        for seg in segs {
            push_segment(seg, &mut bs);
        }
        push_terminator(&mut bs);
        pad_remaining_capacity(&mut bs);
        Ok((bs, ver))
    }

    pub fn encode_with_version(
        data: &[u8],
        ecl: ECLevel,
        ver: Version,
        mode: Option<Mode>,
    ) -> QRResult<BitStream> {
        let bcap = ver.data_bit_capacity(ecl);
        let segs = compute_segments(data, ver, mode)?;
        let sz: usize = segs.iter().map(|s| s.bit_len()).sum();
        if sz > bcap {
            return Err(QRError::CapacityExceeded(ecl));
        }
        let mut bs = BitStream::new(bcap);
        for seg in segs {
            push_segment(seg, &mut bs);
        }
        push_terminator(&mut bs);
        pad_remaining_capacity(&mut bs);
        Ok(bs)
    }

    fn find_optimal_version_and_segments(
        data: &[u8],
        ecl: ECLevel,
        min_version: usize,
        mode: Option<Mode>,
    ) -> QRResult<(Version, Vec<Segment>)> {
        debug_assert!((1..=40).contains(&min_version), "Invalid min version: {min_version}");

        let mut segs = vec![];
        let mut sz = 0;
        for v in min_version..=40 {
            let ver = Version::Normal(v);
            let bcap = ver.data_bit_capacity(ecl);
            // Character count widths only change at the band boundaries
            if v == min_version || v == 10 || v == 27 {
                segs = compute_segments(data, ver, mode)?;
                sz = segs.iter().map(|s| s.bit_len()).sum();
            }
            if sz <= bcap {
                return Ok((ver, segs));
            }
        }
        Err(QRError::CapacityExceeded(ecl))
    }

    fn compute_segments<'a>(
        data: &'a [u8],
        ver: Version,
        mode: Option<Mode>,
    ) -> QRResult<Vec<Segment<'a>>> {
        match mode {
            Some(m) => forced_segment(data, ver, m).map(|s| vec![s]),
            None => Ok(compute_optimal_segments(data, ver)),
        }
    }

    fn forced_segment<'a>(data: &'a [u8], ver: Version, mode: Mode) -> QRResult<Segment<'a>> {
        if let Some(&b) = data.iter().find(|b| !mode.contains(**b)) {
            return Err(QRError::UnencodableChar(mode, b as char));
        }
        Ok(Segment::new(mode, ver.mode_bits(), ver.char_cnt_bits(mode), data))
    }

    // Dynamic programming over char positions and modes; costs are tracked
    // in 1/6 bit units so numeric (10/3) and alphanumeric (11/2) per-char
    // costs stay integral
    fn compute_optimal_segments(data: &[u8], ver: Version) -> Vec<Segment> {
        debug_assert!(!data.is_empty(), "Empty data");

        let mut prev_cost = [0usize; 3];
        MODES.iter().enumerate().for_each(|(i, &m)| prev_cost[i] = (4 + ver.char_cnt_bits(m)) * 6);
        let mut cur_cost = [usize::MAX; 3];
        let mut min_path = vec![[usize::MAX; 3]; data.len()];
        for (i, b) in data.iter().enumerate() {
            for (j, to_mode) in MODES.iter().enumerate() {
                if !to_mode.contains(*b) {
                    continue;
                }
                let encoded_char_size = match to_mode {
                    Mode::Numeric => 20,
                    Mode::Alphanumeric => 33,
                    Mode::Byte => 48,
                    Mode::Kanji => unreachable!("Kanji is never segmented"),
                };
                for (k, from_mode) in MODES.iter().enumerate() {
                    if prev_cost[k] == usize::MAX {
                        continue;
                    }
                    let mut cost = 0;
                    if to_mode != from_mode {
                        cost += (prev_cost[k] + 5) / 6 * 6;
                        cost += (4 + ver.char_cnt_bits(*to_mode)) * 6;
                    } else {
                        cost += prev_cost[k];
                    }
                    cost += encoded_char_size;
                    if cost < cur_cost[j] {
                        cur_cost[j] = cost;
                        min_path[i][j] = k;
                    }
                }
            }
            swap(&mut prev_cost, &mut cur_cost);
            cur_cost.fill(usize::MAX);
        }

        let char_modes = trace_optimal_modes(min_path, prev_cost);
        build_segments(ver, char_modes, data)
    }

    // Backtrack min_path to recover the per-char mode choice
    fn trace_optimal_modes(min_path: Vec<[usize; 3]>, prev_cost: [usize; 3]) -> Vec<Mode> {
        let mut mode_index = 0;
        for i in 1..3 {
            if prev_cost[i] < prev_cost[mode_index] {
                mode_index = i;
            }
        }
        (0..min_path.len())
            .rev()
            .scan(mode_index, |mi, i| {
                let old_mi = *mi;
                *mi = min_path[i][*mi];
                Some(MODES[old_mi])
            })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    // Merge consecutive equal char modes into segments
    fn build_segments(ver: Version, char_modes: Vec<Mode>, data: &[u8]) -> Vec<Segment> {
        let len = data.len();
        let mut segs: Vec<Segment> = vec![];
        let mut seg_start = 0;
        let mut seg_mode = char_modes[0];
        for (i, &m) in char_modes.iter().enumerate().skip(1) {
            if seg_mode != m {
                let mode_bits = ver.mode_bits();
                let len_bits = ver.char_cnt_bits(seg_mode);
                segs.push(Segment::new(seg_mode, mode_bits, len_bits, &data[seg_start..i]));
                seg_mode = m;
                seg_start = i;
            }
        }
        let mode_bits = ver.mode_bits();
        let len_bits = ver.char_cnt_bits(seg_mode);
        segs.push(Segment::new(seg_mode, mode_bits, len_bits, &data[seg_start..len]));

        segs
    }

}

// Writer for encoded data
//------------------------------------------------------------------------------

pub(super) mod writer {
    use crate::common::codec::{Mode, Segment, PADDING_CODEWORDS};
    use crate::common::BitStream;

    pub fn push_segment(seg: Segment, out: &mut BitStream) {
        push_header(&seg, out);
        match seg.mode {
            Mode::Numeric => push_numeric_data(seg.data, out),
            Mode::Alphanumeric => push_alphanumeric_data(seg.data, out),
            Mode::Byte => push_byte_data(seg.data, out),
            Mode::Kanji => unreachable!("Kanji encoding is not supported"),
        }
    }

    fn push_header(seg: &Segment, out: &mut BitStream) {
        out.push_bits(seg.mode as u8, seg.mode_bits);
        let char_cnt = seg.data.len();
        debug_assert!(
            char_cnt < (1 << seg.len_bits),
            "Char count exceeds bit length: Char count {char_cnt}, Char count bits {}",
            seg.len_bits
        );
        out.push_bits(char_cnt as u16, seg.len_bits);
    }

    fn push_numeric_data(data: &[u8], out: &mut BitStream) {
        for chunk in data.chunks(3) {
            let len = (chunk.len() * 10 + 2) / 3;
            let data = Mode::Numeric.encode_chunk(chunk);
            out.push_bits(data, len);
        }
    }

    fn push_alphanumeric_data(data: &[u8], out: &mut BitStream) {
        for chunk in data.chunks(2) {
            let len = (chunk.len() * 11 + 1) / 2;
            let data = Mode::Alphanumeric.encode_chunk(chunk);
            out.push_bits(data, len);
        }
    }

    fn push_byte_data(data: &[u8], out: &mut BitStream) {
        for &byte in data {
            out.push_bits(byte, 8);
        }
    }

    // Terminator 0000, truncated to whatever capacity remains
    pub fn push_terminator(out: &mut BitStream) {
        let bit_len = out.len();
        let bit_capacity = out.capacity();
        if bit_len < bit_capacity {
            let term_len = std::cmp::min(4, bit_capacity - bit_len);
            out.push_bits(0, term_len);
        }
    }

    pub fn pad_remaining_capacity(out: &mut BitStream) {
        push_padding_bits(out);
        push_padding_codewords(out);
    }

    fn push_padding_bits(out: &mut BitStream) {
        let offset = out.len() & 7;
        if offset > 0 {
            let padding_bits_len = 8 - offset;
            out.push_bits(0, padding_bits_len);
        }
    }

    fn push_padding_codewords(out: &mut BitStream) {
        let offset = out.len() & 7;
        debug_assert!(offset == 0, "Bit offset should be zero before padding codewords: {offset}");

        let remain_byte_capacity = (out.capacity() - out.len()) >> 3;
        PADDING_CODEWORDS.iter().copied().cycle().take(remain_byte_capacity).for_each(|pc| {
            out.push_bits(pc, 8);
        });
    }

}
