//! Internet checksum (RFC 1071)
//!
//! The checksum is the 16-bit one's complement of the one's complement sum of all 16-bit words
//! of the message. Words are read in network byte order and an odd trailing byte is padded with a
//! zero byte on the right.

/// Add two 16-bit words with end-around carry
///
/// Folding the carry back into the low bits can itself overflow, so the fold is repeated until the
/// value fits into 16 bits again.
pub fn ones_complement_add(a: u16, b: u16) -> u16 {
    let mut sum = u32::from(a) + u32::from(b);
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum as u16
}

/// One's complement sum of all 16-bit words in `bytes`, without the final inversion
pub fn ones_complement_sum(bytes: &[u8]) -> u16 {
    let words = bytes.chunks_exact(2);
    let sum = match *words.remainder() {
        [hi] => u16::from_be_bytes([hi, 0]),
        _ => 0,
    };

    words.fold(sum, |acc, word| {
        ones_complement_add(acc, u16::from_be_bytes([word[0], word[1]]))
    })
}

/// Compute the checksum of `bytes`
///
/// To checksum an ICMP message, the checksum field has to be zeroed first. Running the checksum
/// over a message that already carries its correct checksum yields zero.
pub fn checksum(bytes: &[u8]) -> u16 {
    !ones_complement_sum(bytes)
}
