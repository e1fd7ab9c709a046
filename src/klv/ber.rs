//! BER length and BER-OID tag encoding.

/// Decodes a BER length; returns `(length, bytes consumed)`.
/// Long form is limited to 8 length bytes and the indefinite form is rejected.
pub fn read_length(data: &[u8]) -> Option<(usize, usize)> {
    let first = *data.first()?;
    if first & 0x80 == 0 {
        return Some((first as usize, 1));
    }
    let count = (first & 0x7F) as usize;
    if count == 0 || count > 8 || data.len() < 1 + count {
        return None;
    }
    let length = data[1..=count]
        .iter()
        .try_fold(0u64, |acc, &b| acc.checked_mul(256).map(|v| v | b as u64))?;
    usize::try_from(length).ok().map(|len| (len, 1 + count))
}

pub fn write_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = (length as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (8 - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Decodes a BER-OID tag (7 bits per byte, high bit continues).
pub fn read_oid(data: &[u8]) -> Option<(u32, usize)> {
    let mut tag = 0u32;
    for (i, &b) in data.iter().take(4).enumerate() {
        tag = (tag << 7) | (b & 0x7F) as u32;
        if b & 0x80 == 0 {
            return Some((tag, i + 1));
        }
    }
    None
}

pub fn write_oid(out: &mut Vec<u8>, tag: u32) {
    let mut groups = vec![(tag & 0x7F) as u8];
    let mut rest = tag >> 7;
    while rest > 0 {
        groups.push(0x80 | (rest & 0x7F) as u8);
        rest >>= 7;
    }
    out.extend(groups.iter().rev());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        assert_eq!(read_length(&[0x05]), Some((5, 1)));
        assert_eq!(read_length(&[0x81, 0xC8]), Some((200, 2)));
        assert_eq!(read_length(&[0x82, 0x01, 0x00]), Some((256, 3)));
        assert_eq!(read_length(&[0x80]), None);
        assert_eq!(read_length(&[0x82, 0x01]), None);

        let mut out = Vec::new();
        write_length(&mut out, 300);
        assert_eq!(out, vec![0x82, 0x01, 0x2C]);
    }

    #[test]
    fn test_oid_tags() {
        assert_eq!(read_oid(&[0x0D]), Some((13, 1)));
        assert_eq!(read_oid(&[0x81, 0x0F]), Some((143, 2)));
        assert_eq!(read_oid(&[0x81]), None);

        let mut out = Vec::new();
        write_oid(&mut out, 143);
        assert_eq!(out, vec![0x81, 0x0F]);
    }
}
