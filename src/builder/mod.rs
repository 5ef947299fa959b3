mod qr;

pub use qr::{Module, QR};

use std::ops::Deref;

use tracing::debug;

use crate::common::{
    codec::{encode, encode_with_version, Mode},
    ec::ecc,
    error::{QRError, QRResult},
    mask::{apply_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
    BitStream,
};

pub struct QRBuilder<'a> {
    data: &'a [u8],
    version: Option<Version>,
    min_version: usize,
    ec_level: ECLevel,
    mode: Option<Mode>,
    mask: Option<MaskPattern>,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, version: None, min_version: 1, ec_level: ECLevel::M, mode: None, mask: None }
    }

    pub fn data(&mut self, data: &'a [u8]) -> &mut Self {
        self.data = data;
        self
    }

    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn unset_version(&mut self) -> &mut Self {
        self.version = None;
        self
    }

    // Lower bound for the version search; ignored when an exact version is set
    pub fn min_version(&mut self, min_version: usize) -> &mut Self {
        self.min_version = min_version;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    // Forces the whole input into a single segment of the given mode
    pub fn mode(&mut self, mode: Mode) -> &mut Self {
        self.mode = Some(mode);
        self
    }

    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn metadata(&self) -> String {
        match self.version {
            Some(v) => format!("{{ Version: {:?}, Ec level: {:?} }}", *v, self.ec_level),
            None => format!("{{ Version: None, Ec level: {:?} }}", self.ec_level),
        }
    }
}


impl QRBuilder<'_> {
    pub fn build(&self) -> QRResult<QR> {
        debug!(meta = %self.metadata(), "Generating QR");

        if self.data.is_empty() {
            return Err(QRError::EmptyData);
        }
        match self.version {
            // Micro QR capacity tables exist but the encoder path does not
            Some(Version::Micro(_)) => return Err(QRError::InvalidVersion),
            Some(Version::Normal(v)) if !(1..=40).contains(&v) => {
                return Err(QRError::InvalidVersion)
            }
            _ => {}
        }
        if !(1..=40).contains(&self.min_version) {
            return Err(QRError::InvalidVersion);
        }

        // Encode data optimally
        let (encoded_data, version) = match self.version {
            Some(v) => (encode_with_version(self.data, self.ec_level, v, self.mode)?, v),
            None => encode(self.data, self.ec_level, self.min_version, self.mode)?,
        };
        debug!(version = ?version, "Segmented and encoded data");

        // Compute error correction codewords and interleave
        let total_codewords = version.total_codewords();
        let mut payload = BitStream::new(total_codewords << 3);
        let (data_blocks, ecc_blocks) = Self::compute_ecc(encoded_data.data(), version, self.ec_level);
        payload.extend(&Self::interleave(&data_blocks));
        payload.extend(&Self::interleave(&ecc_blocks));

        // Construct the symbol
        let mut qr = QR::new(version, self.ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(payload.data());

        let mask = match self.mask {
            Some(m) => {
                qr.mask(m);
                m
            }
            None => apply_best_mask(&mut qr),
        };

        let total_modules = version.width() * version.width();
        let dark_modules = qr.count_dark_modules();
        debug!(
            mask = *mask,
            data_capacity = version.data_bit_capacity(self.ec_level) >> 3,
            ec_capacity = Self::ec_capacity(version, self.ec_level),
            encoded_size = encoded_data.len() >> 3,
            balance = dark_modules * 100 / total_modules,
            "QR generated"
        );

        Ok(qr)
    }

    // ECC: Error Correction Codeword generator
    fn compute_ecc(data: &[u8], version: Version, ec_level: ECLevel) -> (Vec<&[u8]>, Vec<Vec<u8>>) {
        let data_blocks = Self::blockify(data, version, ec_level);

        let ecc_size_per_block = version.ecc_per_block(ec_level);
        let ecc_blocks = data_blocks.iter().map(|b| ecc(b, ecc_size_per_block)).collect::<Vec<_>>();

        (data_blocks, ecc_blocks)
    }

    pub(crate) fn blockify(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<&[u8]> {
        let groups = version.block_groups(ec_level);
        let total_blocks: usize = groups.iter().map(|g| g.count).sum();
        let total_size: usize = groups.iter().map(|g| g.count * g.data).sum();

        debug_assert!(
            total_size == data.len(),
            "Data len doesn't match total size of blocks: Data len {}, Total block size {}",
            data.len(),
            total_size
        );

        let mut data_blocks = Vec::with_capacity(total_blocks);
        let mut offset = 0;
        for group in groups {
            for _ in 0..group.count {
                data_blocks.push(&data[offset..offset + group.data]);
                offset += group.data;
            }
        }
        data_blocks
    }

    // Number of codewords recoverable per symbol; p is the misdecode
    // protection reserve of the small versions
    pub fn ec_capacity(version: Version, ec_level: ECLevel) -> usize {
        let p = match (version, ec_level) {
            (Version::Micro(2) | Version::Normal(1), ECLevel::L) => 3,
            (Version::Micro(_) | Version::Normal(2), ECLevel::L)
            | (Version::Micro(2) | Version::Normal(1), ECLevel::M) => 2,
            (Version::Normal(1), _) | (Version::Normal(3), ECLevel::L) => 1,
            _ => 0,
        };

        (version.ec_codewords(ec_level) - p) / 2
    }

    pub fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
        let max_block_size = blocks.iter().map(|b| b.len()).max().expect("Blocks is empty");
        let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
        let mut res = Vec::with_capacity(total_size);
        for i in 0..max_block_size {
            for b in blocks {
                if i < b.len() {
                    res.push(b[i]);
                }
            }
        }
        res
    }
}

#[cfg(test)]
mod builder_tests {
    use test_case::test_case;

    use super::QRBuilder;
    use crate::common::error::QRError;
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_add_ec_simple() {
        let msg = b" [\x0bx\xd1r\xdcMC@\xec\x11\xec\x11\xec\x11";
        let expected_ecc = [b"\xc4\x23\x27\x77\xeb\xd7\xe7\xe2\x5d\x17"];
        let (_, ecc) = QRBuilder::compute_ecc(msg, Version::Normal(1), ECLevel::M);
        assert_eq!(&*ecc, expected_ecc);
    }

    #[test]
    fn test_add_ec_complex() {
        let msg = b"CUF\x86W&U\xc2w2\x06\x12\x06g&\xf6\xf6B\x07v\x86\xf2\x07&V\x16\xc6\xc7\x92\x06\
                    \xb6\xe6\xf7w2\x07v\x86W&R\x06\x86\x972\x07F\xf7vV\xc2\x06\x972\x10\xec\x11\xec\
                    \x11\xec\x11\xec";
        let expected_ec = [
            b"\xd5\xc7\x0b\x2d\x73\xf7\xf1\xdf\xe5\xf8\x9a\x75\x9a\x6f\x56\xa1\x6f\x27",
            b"\x57\xcc\x60\x3c\xca\xb6\x7c\x9d\xc8\x86\x1b\x81\xd1\x11\xa3\xa3\x78\x85",
            b"\x94\x74\xb1\xd4\x4c\x85\x4b\xf2\xee\x4c\xc3\xe6\xbd\x0a\x6c\xf0\xc0\x8d",
            b"\xeb\x9f\x05\xad\x18\x93\x3b\x21\x6a\x28\xff\xac\x52\x02\x83\x20\xb2\xec",
        ];
        let (_, ecc) = QRBuilder::compute_ecc(msg, Version::Normal(5), ECLevel::Q);
        assert_eq!(&*ecc, &expected_ec[..]);
    }

    #[test]
    fn test_blockify_two_groups() {
        // Version 5 Q splits into 2 blocks of 15 and 2 blocks of 16
        let data = (0u8..62).collect::<Vec<_>>();
        let blocks = QRBuilder::blockify(&data, Version::Normal(5), ECLevel::Q);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].len(), 15);
        assert_eq!(blocks[1].len(), 15);
        assert_eq!(blocks[2].len(), 16);
        assert_eq!(blocks[3].len(), 16);
        assert_eq!(blocks[3][15], 61);
    }

    #[test]
    fn test_interleave() {
        let blocks = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9, 0]];
        let interleaved = QRBuilder::interleave(&blocks);
        let exp_interleaved = vec![1, 4, 7, 2, 5, 8, 3, 6, 9, 0];
        assert_eq!(interleaved, exp_interleaved);
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(QRBuilder::new(b"").build().unwrap_err(), QRError::EmptyData);
    }

    #[test]
    fn test_micro_version_rejected() {
        let res = QRBuilder::new(b"OK").version(Version::Micro(2)).build();
        assert_eq!(res.unwrap_err(), QRError::InvalidVersion);
    }

    #[test_case("Hello, world!🌎".to_string(), Version::Normal(1), ECLevel::L)]
    #[test_case("TEST".to_string(), Version::Normal(1), ECLevel::M)]
    #[test_case("12345".to_string(), Version::Normal(1), ECLevel::Q)]
    #[test_case("OK".to_string(), Version::Normal(1), ECLevel::H)]
    #[test_case("A11111111111111".repeat(11).to_string(), Version::Normal(7), ECLevel::M)]
    #[test_case("aAAAAAA1111111111111AAAAAAa".repeat(3).to_string(), Version::Normal(7), ECLevel::Q)]
    #[test_case("1234567890".repeat(15).to_string(), Version::Normal(7), ECLevel::H)]
    #[test_case("A11111111111111".repeat(20).to_string(), Version::Normal(10), ECLevel::M)]
    #[test_case("aAAAAAAAAA1111111111111111AAAAAAAAAAa".repeat(4).to_string(), Version::Normal(10), ECLevel::Q)]
    #[test_case("1234567890".repeat(28).to_string(), Version::Normal(10), ECLevel::H)]
    #[test_case("A111111111111111".repeat(100).to_string(), Version::Normal(27), ECLevel::M)]
    #[test_case("aAAAAAAAAA111111111111111111AAAAAAAAAAa".repeat(20).to_string(), Version::Normal(27), ECLevel::Q)]
    #[test_case("1234567890".repeat(145).to_string(), Version::Normal(27), ECLevel::H)]
    #[test_case("A111111111111111".repeat(97).to_string(), Version::Normal(40), ECLevel::M)]
    #[test_case("1234567890".repeat(305).to_string(), Version::Normal(40), ECLevel::H)]
    fn test_builder(data: String, version: Version, ec_level: ECLevel) {
        let qr = QRBuilder::new(data.as_bytes())
            .version(version)
            .ec_level(ec_level)
            .build()
            .unwrap()
            .render(10);

        let mut img = rqrr::PreparedImage::prepare(qr);
        let grids = img.detect_grids();
        assert_eq!(grids.len(), 1);
        let (meta, content) = grids[0].decode().unwrap();

        assert_eq!(*version, meta.version.0);
        assert_eq!(data, content);
    }

    #[test]
    fn test_builder_data_overflow() {
        let data = "1234567890".repeat(306).to_string();

        let res = QRBuilder::new(data.as_bytes())
            .version(Version::Normal(40))
            .ec_level(ECLevel::H)
            .build();
        assert_eq!(res.unwrap_err(), QRError::CapacityExceeded(ECLevel::H));
    }
}
