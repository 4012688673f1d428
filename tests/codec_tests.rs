//! Integration tests for the field codecs: CRC-16, BCD, binary and date/time.

use chrono::NaiveDate;
use proptest::prelude::*;
use sas_egm::codec::{
    calculate_and_append_crc, check_crc, from_bcd_with_validation, from_binary_u64,
    generate_crc16, pack_date_time, to_bcd, to_binary, unpack_date_time,
};
use sas_egm::SasError;

const KERMIT: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_KERMIT);

/// The SAS CRC is CRC-16/KERMIT computed a nibble at a time.
#[test]
fn test_crc_matches_kermit_catalog() {
    for data in [&b""[..], b"123456789", &[0x01, 0x1F], &[0x00, 0x7F, 0x12, 0x31]] {
        assert_eq!(generate_crc16(data, data.len()), KERMIT.checksum(data));
    }
}

/// A real long poll: 0x7F date/time to address 1.
#[test]
fn test_crc_on_long_poll() {
    let poll = [0x01, 0x7F, 0x10, 0x16, 0x20, 0x26, 0x13, 0x45, 0x00];
    let framed = calculate_and_append_crc(&poll);
    assert_eq!(framed.len(), poll.len() + 2);
    assert!(check_crc(&framed));
    let crc = KERMIT.checksum(&poll).to_le_bytes();
    assert_eq!(&framed[poll.len()..], &crc[..]);
}

#[test]
fn test_short_frames_fail_crc() {
    assert!(!check_crc(&[]));
    assert!(!check_crc(&[0x01, 0x00, 0x00]));
}

#[test]
fn test_bcd_rejects_hex_nibbles() {
    assert_eq!(from_bcd_with_validation(&[0x12, 0x3A], 0, 2), (0, false));
    assert_eq!(from_bcd_with_validation(&[0x12, 0x34], 1, 2), (0, false));
    assert_eq!(from_bcd_with_validation(&[0x12, 0x34], 0, 2), (1234, true));
}

#[test]
fn test_binary_overflow_and_range() {
    assert!(matches!(to_binary(0x1_0000, 2), Err(SasError::Overflow { .. })));
    assert!(matches!(to_binary(1, 0), Err(SasError::Range { .. })));
    assert!(matches!(
        from_binary_u64(&[0x01], 0, 2),
        Err(SasError::Range { .. })
    ));
}

#[test]
fn test_date_time_fields() {
    let value = NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(13, 45, 0)
        .unwrap();
    let packed = pack_date_time(value);
    assert_eq!(packed, vec![0x10, 0x16, 0x20, 0x26, 0x13, 0x45, 0x00]);
    assert_eq!(unpack_date_time(&packed), Some(value));
    // 13th month
    assert_eq!(
        unpack_date_time(&[0x13, 0x01, 0x20, 0x26, 0x00, 0x00, 0x00]),
        None
    );
}

proptest! {
    #[test]
    fn prop_crc_accepts_framed(data in proptest::collection::vec(any::<u8>(), 2..64)) {
        prop_assert!(check_crc(&calculate_and_append_crc(&data)));
    }

    #[test]
    fn prop_crc_detects_single_bit_flip(
        data in proptest::collection::vec(any::<u8>(), 2..64),
        bit in 0usize..512,
    ) {
        let mut framed = calculate_and_append_crc(&data);
        let bit = bit % (framed.len() * 8);
        framed[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(!check_crc(&framed));
    }

    #[test]
    fn prop_bcd_round_trip(value in 0u64..10_000_000_000, length in 5usize..=8) {
        let packed = to_bcd(value, length);
        prop_assert_eq!(from_bcd_with_validation(&packed, 0, length), (value, true));
    }

    #[test]
    fn prop_binary_round_trip(value in any::<u32>()) {
        let packed = to_binary(u64::from(value), 4).unwrap();
        prop_assert_eq!(from_binary_u64(&packed, 0, 4).unwrap(), u64::from(value));
    }
}
