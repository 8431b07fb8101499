//! Human readable text buffer.
//!
//! Every mutation is bounded by [HRT_CAP] and silently truncates instead of
//! overflowing. Methods return the number of bytes actually written.

use core::fmt;

/// Maximum length of the human readable text, in bytes.
pub const HRT_CAP: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hrt {
    buf: Vec<u8>,
}

impl Hrt {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The text as a `&str`. Builders only ever store UTF-8 or ASCII, any
    /// stray bytes from [Hrt::cpy_nochk] are replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn room(&self) -> usize {
        HRT_CAP - self.buf.len()
    }

    /// Append as much of `src` as fits.
    pub fn cat(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.room());
        self.buf.extend_from_slice(&src[..n]);
        n
    }

    /// Replace the text with `src`, truncated to the cap.
    pub fn cpy(&mut self, src: &[u8]) -> usize {
        self.buf.clear();
        self.cat(src)
    }

    /// Copy without validation, for callers that already checked `src`.
    pub fn cpy_nochk(&mut self, src: &[u8]) -> usize {
        self.cpy(src)
    }

    pub fn cpy_chr(&mut self, c: u8) -> usize {
        self.buf.clear();
        self.cat_chr(c)
    }

    pub fn cat_chr(&mut self, c: u8) -> usize {
        if self.room() == 0 {
            return 0;
        }
        self.buf.push(c);
        1
    }

    /// Join `a` and `b` with an optional single separator byte.
    pub fn cpy_cat(&mut self, a: &[u8], separator: Option<u8>, b: &[u8]) -> usize {
        let mut n = self.cpy(a);
        if let Some(sep) = separator {
            n += self.cat_chr(sep);
        }
        n + self.cat(b)
    }

    /// Replace with `src` read as ISO/IEC 8859-1 and stored as UTF-8. A
    /// character whose encoding does not fit entirely is dropped.
    pub fn cpy_iso8859_1(&mut self, src: &[u8]) -> usize {
        self.buf.clear();
        for &c in src {
            if c < 0x80 {
                if self.room() < 1 {
                    break;
                }
                self.buf.push(c);
            } else {
                if self.room() < 2 {
                    break;
                }
                self.buf.push(0xC0 | (c >> 6));
                self.buf.push(0x80 | (c & 0x3F));
            }
        }
        self.buf.len()
    }

    /// Replace with formatted text, truncated at a character boundary.
    pub fn printf(&mut self, args: fmt::Arguments) -> usize {
        self.buf.clear();
        let s = std::fmt::format(args);
        let mut end = s.len().min(HRT_CAP);
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        self.cat(&s.as_bytes()[..end])
    }

    /// Rewrite GS1 AI brackets: `[` becomes `(`, and `]` becomes `)` when
    /// it closes an open bracket. An unmatched `]` is left alone.
    pub fn conv_gs1_brackets(&mut self) {
        let mut depth = 0usize;
        for c in self.buf.iter_mut() {
            match *c {
                b'[' => {
                    *c = b'(';
                    depth += 1;
                }
                b']' if depth > 0 => {
                    *c = b')';
                    depth -= 1;
                }
                _ => (),
            }
        }
    }
}

impl fmt::Display for Hrt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(s: &str) -> String {
        let mut h = Hrt::new();
        h.cpy(s.as_bytes());
        h.conv_gs1_brackets();
        h.to_string_lossy()
    }

    #[test]
    fn test_conv_gs1_brackets() {
        assert_eq!(conv("["), "(");
        assert_eq!(conv("]"), "]");
        assert_eq!(conv("[]"), "()");
        assert_eq!(conv("[[]]["), "(())(");
        assert_eq!(conv("[01]12345678901231[10]AB"), "(01)12345678901231(10)AB");
    }

    #[test]
    fn test_cpy_cat_bounded() {
        let mut h = Hrt::new();
        let long = [b'A'; 300];
        assert_eq!(h.cpy(&long), HRT_CAP);
        assert_eq!(h.cat(b"B"), 0);
        assert_eq!(h.cat_chr(b'C'), 0);
        assert_eq!(h.len(), HRT_CAP);

        assert_eq!(h.cpy(b"12"), 2);
        assert_eq!(h.cat(b"34"), 2);
        assert_eq!(h.cat_chr(b'5'), 1);
        assert_eq!(h.as_bytes(), b"12345");

        assert_eq!(h.cpy_chr(b'X'), 1);
        assert_eq!(h.as_bytes(), b"X");
    }

    #[test]
    fn test_cpy_cat_separator() {
        let mut h = Hrt::new();
        h.cpy_cat(b"123", Some(b'+'), b"45");
        assert_eq!(h.as_bytes(), b"123+45");
        h.cpy_cat(b"123", None, b"45");
        assert_eq!(h.as_bytes(), b"12345");
    }

    #[test]
    fn test_cpy_iso8859_1() {
        let mut h = Hrt::new();
        h.cpy_iso8859_1(b"A\xE9\xFF");
        assert_eq!(h.to_string_lossy(), "Aéÿ");

        // 254 ASCII then a 2-byte character: the character must be dropped
        let mut src = vec![b'a'; 254];
        src.push(0xE9);
        assert_eq!(h.cpy_iso8859_1(&src), 254);
        assert!(core::str::from_utf8(h.as_bytes()).is_ok());

        let all_high = vec![0xE9u8; 200];
        h.cpy_iso8859_1(&all_high);
        assert_eq!(h.len(), 254);
        assert!(core::str::from_utf8(h.as_bytes()).is_ok());
    }

    #[test]
    fn test_printf() {
        let mut h = Hrt::new();
        h.printf(format_args!("{:05}", 42));
        assert_eq!(h.as_bytes(), b"00042");
        let long = "é".repeat(200);
        h.printf(format_args!("{long}"));
        assert_eq!(h.len(), 254);
        assert!(core::str::from_utf8(h.as_bytes()).is_ok());
    }
}
