//! Proquint encoding of 16-bit words as pronounceable five-letter syllables.
//!
//! Each word is laid out as consonant(4) vowel(2) consonant(4) vowel(2)
//! consonant(4), most significant bits first.

const CONSONANTS: &[u8; 16] = b"bdfghjklmnprstvz";
const VOWELS: &[u8; 4] = b"aiou";

pub(crate) const WORD_LEN: usize = 5;
pub(crate) const SEPARATOR: char = '-';

pub(crate) fn encode_word(word: u16, out: &mut String) {
    let c = |shift: u16| CONSONANTS[usize::from((word >> shift) & 0x0f)] as char;
    let v = |shift: u16| VOWELS[usize::from((word >> shift) & 0x03)] as char;

    out.push(c(12));
    out.push(v(10));
    out.push(c(6));
    out.push(v(4));
    out.push(c(0));
}

pub(crate) fn decode_word(syllable: &str) -> Option<u16> {
    let bytes = syllable.as_bytes();
    if bytes.len() != WORD_LEN {
        return None;
    }

    let c = |b: u8| CONSONANTS.iter().position(|&x| x == b).map(|i| i as u16);
    let v = |b: u8| VOWELS.iter().position(|&x| x == b).map(|i| i as u16);

    Some(
        (c(bytes[0])? << 12)
            | (v(bytes[1])? << 10)
            | (c(bytes[2])? << 6)
            | (v(bytes[3])? << 4)
            | c(bytes[4])?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_words() {
        // 127.0.0.1 is the canonical example from the proquint proposal.
        let mut out = String::new();
        encode_word(0x7f00, &mut out);
        out.push(SEPARATOR);
        encode_word(0x0001, &mut out);
        assert_eq!(out, "lusab-babad");
    }

    #[test]
    fn decode_rejects_bad_letters() {
        assert_eq!(decode_word("lusab"), Some(0x7f00));
        assert_eq!(decode_word("lusaa"), None);
        assert_eq!(decode_word("lusa"), None);
        assert_eq!(decode_word("LUSAB"), None);
    }
}
