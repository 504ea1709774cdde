//! Repairs file names that were mangled by an encoding round-trip.
//!
//! Recordings often come off Windows shares or through tools that read UTF-8
//! as Windows-1252, so the same umlaut can reach us as raw Latin-1 bytes, as a
//! `surrogateescape` sequence, or as two-character mojibake. All of them are
//! folded back into the intended characters here.

use regex::Captures;
use std::char::REPLACEMENT_CHARACTER;
use std::ffi::OsStr;

use crate::consts::{SURROGATE_RUN_REGEX, WHITESPACE_REGEX};

/// UTF-8 sequences that were decoded as Windows-1252 (or Latin-1, for the
/// bytes Windows-1252 leaves undefined), mapped back to what they encode.
const FINGERPRINTS: &[(&str, &str)] = &[
    ("â€™", "’"),
    ("â€˜", "‘"),
    ("â€œ", "“"),
    ("â€\u{9d}", "”"),
    ("â€“", "–"),
    ("â€”", "—"),
    ("â€¦", "…"),
    ("Ã„", "Ä"),
    ("Ã\u{84}", "Ä"),
    ("Ã–", "Ö"),
    ("Ã\u{96}", "Ö"),
    ("Ãœ", "Ü"),
    ("Ã\u{9c}", "Ü"),
    ("ÃŸ", "ß"),
    ("Ã\u{9f}", "ß"),
    ("Ã‰", "É"),
    ("Ã\u{89}", "É"),
    ("Ã¤", "ä"),
    ("Ã¶", "ö"),
    ("Ã¼", "ü"),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ãª", "ê"),
    ("Ã«", "ë"),
    ("Ã¡", "á"),
    ("Ã\u{a0}", "à"),
    ("Ã¢", "â"),
    ("Ã§", "ç"),
    ("Ã±", "ñ"),
    ("Ã³", "ó"),
    ("Ã´", "ô"),
    ("Ã\u{ad}", "í"),
    ("Ã®", "î"),
    ("Ã¯", "ï"),
    ("Ãº", "ú"),
    ("Ã»", "û"),
    ("Â°", "°"),
    ("Â´", "´"),
    ("Â§", "§"),
    ("Â²", "²"),
    ("Â³", "³"),
];

/// Returns the repaired form of a name.
///
/// Applying `fix` to its own output never changes it again.
pub fn fix(input: &str) -> String {
    let mut current = pass(input);
    // Every pass either shortens the text or only swaps exotic whitespace for
    // a plain space, so a fixed point is always reached.
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Decodes a name read from the filesystem and repairs it.
///
/// Byte sequences that are not valid UTF-8 are read as Latin-1, which is what
/// older Windows tooling writes for German umlauts.
pub fn fix_os(name: &OsStr) -> String {
    fix(&decode_bytes(name.as_encoded_bytes()))
}

fn pass(input: &str) -> String {
    let mut repaired = SURROGATE_RUN_REGEX
        .replace_all(input, |captures: &Captures| decode_bytes(&escaped_bytes(&captures[0])))
        .into_owned();
    for (broken, intended) in FINGERPRINTS {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, intended);
        }
    }
    let cleaned: String = repaired
        .chars()
        .filter(|c| *c != REPLACEMENT_CHARACTER && (c.is_whitespace() || !c.is_control()))
        .collect();
    WHITESPACE_REGEX.replace_all(cleaned.trim(), " ").into_owned()
}

/// Turns a run of `\udcXX` escapes back into the bytes they stand for.
fn escaped_bytes(run: &str) -> Vec<u8> {
    run.as_bytes()
        .chunks(6)
        .filter_map(|escape| escape.get(4..6))
        .filter_map(|hex| std::str::from_utf8(hex).ok())
        .filter_map(|hex| u8::from_str_radix(hex, 16).ok())
        .collect()
}

fn decode_bytes(bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        decoded.push_str(chunk.valid());
        decoded.extend(chunk.invalid().iter().map(|&byte| char::from(byte)));
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Star Wars Jedi", "Star Wars Jedi")]
    #[case("SchÃ¶ne GrÃ¼ÃŸe", "Schöne Grüße")]
    #[case("Ã„rger mit Ã–l und Ãœbermut", "Ärger mit Öl und Übermut")]
    #[case("Ã\u{84}rger", "Ärger")]
    #[case("Caf\u{c3}\u{a9}", "Café")]
    #[case(r"K\udcc3\udcb6nig", "König")]
    #[case(r"K\udcf6nig", "König")]
    #[case(r"Stra\udcdfe", "Straße")]
    #[case("GL\u{fffd}CK", "GLCK")]
    #[case("  too \t many   spaces ", "too many spaces")]
    #[case("bell\u{7}ringer", "bellringer")]
    #[case("Donâ€™t stop", "Don’t stop")]
    #[case("", "")]
    fn test_fix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(fix(input), expected);
    }

    #[rstest]
    #[case("Ãâ€“")]
    #[case("Ã\u{fffd}¤")]
    #[case(r"\udcc3\udc83\udcc2\udca4")]
    #[case("SchÃ¶ne GrÃ¼ÃŸe")]
    #[case(r"K\udcf6nig \u{a0} merged")]
    fn test_fix_is_idempotent(#[case] input: &str) {
        let once = fix(input);
        assert_eq!(fix(&once), once);
        assert!(!once.contains(REPLACEMENT_CHARACTER));
    }

    /// `\udcXX` escapes for every byte of `text`.
    fn escaped(text: &str) -> String {
        text.bytes().map(|byte| format!(r"\udc{byte:02x}")).collect()
    }

    #[test]
    fn test_every_fingerprint_is_repaired() {
        for (broken, intended) in FINGERPRINTS {
            assert_eq!(fix(broken), *intended, "{broken:?}");
            assert_eq!(fix(&escaped(broken)), *intended, "{broken:?}");
        }
    }

    #[test]
    fn test_fingerprint_combinations_are_idempotent() {
        let mut forms: Vec<String> = Vec::new();
        for (broken, intended) in FINGERPRINTS {
            forms.push(broken.to_string());
            forms.push(intended.to_string());
            forms.push(escaped(broken));
            // Split by a character that gets removed.
            let mut chars = broken.chars();
            let first = chars.next().unwrap();
            forms.push(format!("{first}{REPLACEMENT_CHARACTER}{}", chars.as_str()));
        }
        for left in &forms {
            for right in &forms {
                for joined in [format!("{left}{right}"), format!("{left} {right}"), format!("{left}_{right}")] {
                    let once = fix(&joined);
                    assert_eq!(fix(&once), once, "{joined:?}");
                    assert!(!once.contains(REPLACEMENT_CHARACTER), "{joined:?}");
                }
            }
        }
    }

    #[test]
    fn test_layered_damage_is_fully_repaired() {
        // Mojibake hidden behind the removed replacement character.
        assert_eq!(fix("Ã\u{fffd}¤"), "ä");
        // Decoded escapes that themselves spell mojibake.
        assert_eq!(fix(r"\udcc3\udc83\udcc2\udca4"), "ä");
    }

    #[cfg(unix)]
    #[test]
    fn test_fix_os_reads_latin1_bytes() {
        use std::os::unix::ffi::OsStrExt;
        assert_eq!(fix_os(OsStr::from_bytes(b"K\xf6nig")), "König");
        assert_eq!(fix_os(OsStr::from_bytes("Grüße".as_bytes())), "Grüße");
    }
}
