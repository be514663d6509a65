//! Atomizers: pluggable definitions of what "an atom" means for a file.
//!
//! Every atomizer produces a `(segments, atoms)` pair: `atoms.len() + 1 ==
//! segments.len()`, and `segments[0] || atoms[0] || segments[1] || atoms[1]
//! || ... || atoms[n-1] || segments[n]` reproduces the original file bytes
//! exactly. `before` is `segments[0]` and `after` is the last segment; a
//! simpler two-region model (fixed prefix, reducible atoms, fixed suffix)
//! is the special case where every interior segment is empty, which is
//! exactly what the Line, Char, and Symbol atomizers below produce. JsStr
//! and Attribute are the atomizers that need non-empty interior segments.

use atom::Atom;
use error;

/// A pluggable definition of what an atom is, for some file format.
pub trait Atomizer: ::std::fmt::Debug {
    /// This atomizer's name, as used on the CLI and in the registry.
    fn name(&self) -> &'static str;

    /// Split `contents` into interleaved segments and atoms.
    fn atomize(&self, contents: &[u8]) -> error::Result<(Vec<Vec<u8>>, Vec<Atom>)>;
}

fn line_ranges(contents: &[u8]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, &b) in contents.iter().enumerate() {
        if b == b'\n' {
            ranges.push((start, i + 1));
            start = i + 1;
        }
    }
    if start < contents.len() {
        ranges.push((start, contents.len()));
    }
    ranges
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return needle.is_empty();
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn find_line_containing(contents: &[u8], needle: &[u8]) -> Option<(usize, usize)> {
    line_ranges(contents)
        .into_iter()
        .find(|&(s, e)| contains(&contents[s..e], needle))
}

/// Split `contents` on DDBEGIN/DDEND markers.
///
/// If no line contains `DDBEGIN`, the whole file is the reducible region and
/// both `before` and `after` are empty. If `DDBEGIN` is found but no later
/// line contains `DDEND`, this is an error.
pub fn split_ddbegin_ddend(contents: &[u8]) -> error::Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    match find_line_containing(contents, b"DDBEGIN") {
        None => Ok((Vec::new(), contents.to_vec(), Vec::new())),
        Some((_, begin_end)) => match find_line_containing(&contents[begin_end..], b"DDEND") {
            None => Err(error::Error::MissingDdend),
            Some((rel_start, _)) => {
                let end_start = begin_end + rel_start;
                Ok((
                    contents[..begin_end].to_vec(),
                    contents[begin_end..end_start].to_vec(),
                    contents[end_start..].to_vec(),
                ))
            }
        },
    }
}

fn wrap_region(before: Vec<u8>, atoms: Vec<Atom>, after: Vec<u8>) -> (Vec<Vec<u8>>, Vec<Atom>) {
    let mut segments = Vec::with_capacity(atoms.len() + 1);
    segments.push(before);
    for _ in 1..atoms.len() {
        segments.push(Vec::new());
    }
    if atoms.is_empty() {
        // `before` and `after` both land in the single segment slot.
        let last = segments.pop().unwrap();
        let mut merged = last;
        merged.extend(after);
        segments.push(merged);
    } else {
        segments.push(after);
    }
    (segments, atoms)
}

/// Split on newline boundaries; each atom keeps its trailing newline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line;

impl Atomizer for Line {
    fn name(&self) -> &'static str {
        "line"
    }

    fn atomize(&self, contents: &[u8]) -> error::Result<(Vec<Vec<u8>>, Vec<Atom>)> {
        let (before, middle, after) = split_ddbegin_ddend(contents)?;
        let atoms = line_ranges(&middle)
            .into_iter()
            .map(|(s, e)| Atom::new(middle[s..e].to_vec()))
            .collect();
        Ok(wrap_region(before, atoms, after))
    }
}

/// Each atom is a single Unicode code point, or a single byte if the
/// reducible region is not valid UTF-8 (documented fallback).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Char;

impl Atomizer for Char {
    fn name(&self) -> &'static str {
        "char"
    }

    fn atomize(&self, contents: &[u8]) -> error::Result<(Vec<Vec<u8>>, Vec<Atom>)> {
        let (before, middle, after) = split_ddbegin_ddend(contents)?;
        let atoms = match ::std::str::from_utf8(&middle) {
            Ok(s) => s
                .chars()
                .map(|c| {
                    let mut buf = [0u8; 4];
                    Atom::new(c.encode_utf8(&mut buf).as_bytes().to_vec())
                })
                .collect(),
            Err(_) => middle.iter().map(|&b| Atom::new(vec![b])).collect(),
        };
        Ok(wrap_region(before, atoms, after))
    }
}

const SYMBOL_DELIMITERS: &'static [u8] = b"{}()[],;\n";

/// Split on a set of ASCII delimiters, preserving each delimiter as the tail
/// of the atom that precedes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Symbol;

impl Atomizer for Symbol {
    fn name(&self) -> &'static str {
        "symbol"
    }

    fn atomize(&self, contents: &[u8]) -> error::Result<(Vec<Vec<u8>>, Vec<Atom>)> {
        let mut atoms = Vec::new();
        let mut current = Vec::new();
        for &b in contents {
            current.push(b);
            if SYMBOL_DELIMITERS.contains(&b) {
                atoms.push(Atom::new(::std::mem::replace(&mut current, Vec::new())));
            }
        }
        if !current.is_empty() {
            atoms.push(Atom::new(current));
        }
        Ok(wrap_region(Vec::new(), atoms, Vec::new()))
    }
}

fn is_quote(b: u8) -> bool {
    b == b'"' || b == b'\''
}

/// Atoms are the individual characters inside quoted string literals;
/// everything else (including the quotes themselves) is segment text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsStr;

impl Atomizer for JsStr {
    fn name(&self) -> &'static str {
        "js-str"
    }

    fn atomize(&self, contents: &[u8]) -> error::Result<(Vec<Vec<u8>>, Vec<Atom>)> {
        let mut segments = vec![Vec::new()];
        let mut atoms = Vec::new();
        let mut i = 0;
        let mut in_string = false;
        let mut quote = 0u8;

        while i < contents.len() {
            let b = contents[i];
            if !in_string {
                if is_quote(b) {
                    in_string = true;
                    quote = b;
                    segments.last_mut().unwrap().push(b);
                } else {
                    segments.last_mut().unwrap().push(b);
                }
                i += 1;
            } else if b == b'\\' && i + 1 < contents.len() {
                // Escaped character: keep both bytes as atoms so they
                // round-trip, but an escape can never be split from its
                // backslash by a chunk boundary in practice since we treat
                // the pair as two atoms only when genuinely inside the
                // string; simplicity here favors correctness of round-trip
                // over chunk-granularity purity for escapes.
                atoms.push(Atom::new(vec![b]));
                segments.push(Vec::new());
                atoms.push(Atom::new(vec![contents[i + 1]]));
                segments.push(Vec::new());
                i += 2;
            } else if b == quote {
                in_string = false;
                segments.push(vec![b]);
                i += 1;
            } else {
                atoms.push(Atom::new(vec![b]));
                segments.push(Vec::new());
                i += 1;
            }
        }

        // An unterminated string literal at EOF is not an error here: the
        // trailing bytes already landed in the last segment above, since
        // `in_string` only gates whether a byte becomes an atom or not.
        let _ = in_string;

        Ok((segments, atoms))
    }
}

/// Atoms are `name="value"`-style attribute assignments inside HTML/XML-like
/// tags; everything else, including tag names and the angle brackets, is
/// segment text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute;

impl Atomizer for Attribute {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn atomize(&self, contents: &[u8]) -> error::Result<(Vec<Vec<u8>>, Vec<Atom>)> {
        let mut segments = vec![Vec::new()];
        let mut atoms = Vec::new();
        let mut i = 0;
        let mut in_tag = false;

        while i < contents.len() {
            let b = contents[i];

            if !in_tag {
                if b == b'<' {
                    in_tag = true;
                }
                segments.last_mut().unwrap().push(b);
                i += 1;
                continue;
            }

            if b == b'>' {
                in_tag = false;
                segments.last_mut().unwrap().push(b);
                i += 1;
                continue;
            }

            if b.is_ascii_whitespace() {
                segments.last_mut().unwrap().push(b);
                i += 1;
                continue;
            }

            if is_attr_name_start(b) {
                let name_start = i;
                while i < contents.len() && is_attr_name_byte(contents[i]) {
                    i += 1;
                }
                let mut j = i;
                while j < contents.len() && contents[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < contents.len() && contents[j] == b'=' {
                    let mut k = j + 1;
                    while k < contents.len() && contents[k].is_ascii_whitespace() {
                        k += 1;
                    }
                    if k < contents.len() && is_quote(contents[k]) {
                        let quote = contents[k];
                        let value_start = k;
                        let mut end = k + 1;
                        while end < contents.len() && contents[end] != quote {
                            end += 1;
                        }
                        let value_end = (end + 1).min(contents.len());
                        atoms.push(Atom::new(contents[name_start..value_end].to_vec()));
                        segments.push(Vec::new());
                        i = value_end;
                        continue;
                    }
                }
                // Bare attribute name with no `="value"`: treat as segment
                // text, since there is nothing atom-shaped to remove.
                segments.last_mut().unwrap().extend(&contents[name_start..i]);
                continue;
            }

            segments.last_mut().unwrap().push(b);
            i += 1;
        }

        Ok((segments, atoms))
    }
}

fn is_attr_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

fn is_attr_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':'
}

/// Look up a built-in atomizer by its configuration name.
pub fn lookup(name: &str) -> Option<Box<Atomizer>> {
    match name {
        "line" => Some(Box::new(Line)),
        "char" => Some(Box::new(Char)),
        "symbol" => Some(Box::new(Symbol)),
        "js-str" => Some(Box::new(JsStr)),
        "attribute" => Some(Box::new(Attribute)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserialize(segments: &[Vec<u8>], atoms: &[Atom]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(&segments[0]);
        for (atom, seg) in atoms.iter().zip(&segments[1..]) {
            out.extend(atom.bytes());
            out.extend(seg);
        }
        out
    }

    #[test]
    fn line_round_trip() {
        let input = b"A\nB\nC\n";
        let (segments, atoms) = Line.atomize(input).unwrap();
        assert_eq!(atoms.len(), 3);
        assert_eq!(reserialize(&segments, &atoms), input);
    }

    #[test]
    fn line_ddbegin_ddend() {
        let input = b"// DDBEGIN\na\nb\nc\n// DDEND\ntail\n";
        let (segments, atoms) = Line.atomize(input).unwrap();
        assert_eq!(segments[0], b"// DDBEGIN\n");
        assert_eq!(atoms.len(), 3);
        assert_eq!(reserialize(&segments, &atoms), &input[..]);
    }

    #[test]
    fn line_missing_ddend_is_error() {
        let input = b"// DDBEGIN\na\nb\n";
        assert!(Line.atomize(input).is_err());
    }

    #[test]
    fn char_round_trip() {
        let input = "abçd".as_bytes();
        let (segments, atoms) = Char.atomize(input).unwrap();
        assert_eq!(atoms.len(), 4);
        assert_eq!(reserialize(&segments, &atoms), input);
    }

    #[test]
    fn symbol_round_trip() {
        let input = b"foo(a,b);\nbar";
        let (segments, atoms) = Symbol.atomize(input).unwrap();
        assert_eq!(reserialize(&segments, &atoms), &input[..]);
        assert!(atoms.len() > 1);
    }

    #[test]
    fn js_str_round_trip_and_isolates_string_contents() {
        let input = br#"f("AB", "C")"#;
        let (segments, atoms) = JsStr.atomize(input).unwrap();
        assert_eq!(reserialize(&segments, &atoms), &input[..]);
        let atom_bytes: Vec<u8> = atoms.iter().flat_map(|a| a.bytes().to_vec()).collect();
        assert_eq!(atom_bytes, b"ABC");
    }

    #[test]
    fn attribute_round_trip_and_isolates_assignments() {
        let input = br#"<a href="x" class='y'>text</a>"#;
        let (segments, atoms) = Attribute.atomize(input).unwrap();
        assert_eq!(reserialize(&segments, &atoms), &input[..]);
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms[0].bytes(), br#"href="x""#);
        assert_eq!(atoms[1].bytes(), br#"class='y'"#);
    }

    #[test]
    fn lookup_known_and_unknown() {
        assert!(lookup("line").is_some());
        assert!(lookup("char").is_some());
        assert!(lookup("symbol").is_some());
        assert!(lookup("js-str").is_some());
        assert!(lookup("attribute").is_some());
        assert!(lookup("nonexistent").is_none());
    }
}
