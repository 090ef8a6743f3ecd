use crate::codec::{END, ESC, ESC_END};

/// Frames `payload` for the serial link: a leading `END`, the payload with every `END`
/// replaced by `ESC ESC_END`, then a trailing `END`.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(payload));
    out.push(END);
    for &byte in payload {
        if byte == END {
            out.push(ESC);
            out.push(ESC_END);
        } else {
            out.push(byte);
        }
    }
    out.push(END);
    out
}

/// Number of bytes `encode` produces for `payload`.
pub fn encoded_len(payload: &[u8]) -> usize {
    payload.len() + 2 + payload.iter().filter(|&&b| b == END).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_plain_payload() {
        assert_eq!(encode(&[1, 2, 3]), vec![END, 1, 2, 3, END]);
        assert_eq!(encode(&[]), vec![END, END]);
    }

    #[test]
    fn escapes_end_only() {
        let payload = [0x45, END, ESC, ESC_END, END];
        let encoded = encode(&payload);
        assert_eq!(
            encoded,
            vec![END, 0x45, ESC, ESC_END, ESC, ESC_END, ESC, ESC_END, END]
        );
        assert_eq!(encoded.len(), encoded_len(&payload));
        assert_eq!(encoded.len(), payload.len() + 2 + 2);
    }

    #[test]
    fn lone_end() {
        assert_eq!(encode(&[END]), vec![END, ESC, ESC_END, END]);
    }
}
