//! Checksum implementation for `ICMP` over IPv4.
//!
//! This code is derived from [`libpnet`] which is available under the Apache 2.0 license.
//!
//! [`libpnet`]: https://github.com/libpnet/libpnet

/// Calculate the checksum for an `IPv4` `ICMP` packet.
///
/// The checksum field itself (the second 16 bit word of the packet) is
/// excluded from the calculation.
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    checksum(data, 1)
}

fn checksum(data: &[u8], ignore_word: usize) -> u16 {
    if data.is_empty() {
        return 0;
    }
    finalize_checksum(sum_be_words(data, ignore_word))
}

fn sum_be_words(data: &[u8], ignore_word: usize) -> u32 {
    let len = data.len();
    let mut cur_data = data;
    let mut sum = 0u32;
    let mut i = 0;
    while cur_data.len() >= 2 {
        if i != ignore_word {
            sum += u32::from(u16::from_be_bytes([cur_data[0], cur_data[1]]));
        }
        cur_data = &cur_data[2..];
        i += 1;
    }
    if i != ignore_word && len & 1 != 0 {
        sum += u32::from(data[len - 1]) << 8;
    }
    sum
}

const fn finalize_checksum(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    !sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_empty_checksum() {
        assert_eq!(0, icmp_ipv4_checksum(&[]));
    }

    #[test]
    fn test_echo_request_checksum() {
        let packet = hex!("08 00 70 93 04 d2 82 9a");
        assert_eq!(0x7093, icmp_ipv4_checksum(&packet));
    }

    #[test]
    fn test_echo_reply_checksum_with_payload() {
        let packet = hex!("00 00 36 66 04 d2 00 01 61 62 63 64");
        assert_eq!(0x3666, icmp_ipv4_checksum(&packet));
    }

    #[test]
    fn test_odd_length_checksum() {
        let packet = hex!("0b 00 f0 fd 00 00 00 00 01 02 03");
        assert_eq!(0xf0fd, icmp_ipv4_checksum(&packet));
    }

    #[test]
    fn test_carry_folding() {
        assert_eq!(0, icmp_ipv4_checksum(&[0xff; 40]));
    }
}
