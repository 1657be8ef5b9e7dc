//! Candidate domain name generation.
//!
//! A [`CandidateSpace`] enumerates every label of length 3 through `L` over
//! an ordered alphabet, shortest labels first and radix (odometer) order
//! within a length, each suffixed with a fixed TLD. Every candidate has a
//! generation index, and any index can be decoded directly into its label,
//! so a search can resume from a watermark without replaying predecessors.
//!
//! # Examples
//!
//! ```
//! use domain_prospect_lib::generate::CandidateSpace;
//!
//! let space = CandidateSpace::new(3, &['a', 'b'], "com").unwrap();
//! assert_eq!(space.len(), 8);
//!
//! let names: Vec<_> = space.iter().map(|c| c.domain).collect();
//! assert_eq!(names[0], "aaa.com");
//! assert_eq!(names[1], "aab.com");
//! assert_eq!(names[7], "bbb.com");
//!
//! // Resuming decodes the index instead of replaying the prefix
//! let resumed: Vec<_> = space.iter_from(6).map(|c| c.domain).collect();
//! assert_eq!(resumed, vec!["bba.com", "bbb.com"]);
//! ```
//!
//! Duplicate characters in the alphabet produce duplicate names. That is the
//! caller's error and is not checked here.

use crate::error::ProspectError;
use crate::types::Candidate;

/// Shortest label the generator produces.
pub const MIN_LABEL_LENGTH: usize = 3;

/// Longest label DNS allows.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Lowercase letters a-z.
fn letter_chars() -> Vec<char> {
    ('a'..='z').collect()
}

/// Digits 0-9.
fn digit_chars() -> Vec<char> {
    ('0'..='9').collect()
}

/// Parse an alphabet specification.
///
/// Accepts the presets `letters`, `digits` and `alnum`, or a literal list
/// of characters such as `"abc123"`. Literal characters must be lowercase
/// ASCII letters, digits or `-`; order is preserved and defines the
/// enumeration order.
pub fn parse_alphabet(spec: &str) -> Result<Vec<char>, ProspectError> {
    let trimmed = spec.trim();

    match trimmed {
        "letters" => return Ok(letter_chars()),
        "digits" => return Ok(digit_chars()),
        "alnum" => {
            let mut chars = letter_chars();
            chars.extend(digit_chars());
            return Ok(chars);
        }
        _ => {}
    }

    if trimmed.is_empty() {
        return Err(ProspectError::invalid_alphabet(
            spec,
            "alphabet cannot be empty",
        ));
    }

    let chars: Vec<char> = trimmed.chars().collect();
    validate_alphabet(&chars)?;
    Ok(chars)
}

/// Check that every character can appear in a DNS label.
pub(crate) fn validate_alphabet(chars: &[char]) -> Result<(), ProspectError> {
    if chars.is_empty() {
        return Err(ProspectError::invalid_alphabet(
            "",
            "alphabet cannot be empty",
        ));
    }

    if let Some(bad) = chars
        .iter()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || **c == '-'))
    {
        let rendered: String = chars.iter().collect();
        return Err(ProspectError::invalid_alphabet(
            rendered,
            format!(
                "character '{}' is not allowed (use a-z, 0-9 or '-')",
                bad
            ),
        ));
    }

    Ok(())
}

/// Number of candidates for labels of length 3..=`max_length` over an
/// alphabet of `radix` characters, or `None` if it does not fit in `u64`.
pub fn space_size(max_length: usize, radix: usize) -> Option<u64> {
    let radix = u64::try_from(radix).ok()?;
    let mut total: u64 = 0;
    for length in MIN_LABEL_LENGTH..=max_length {
        let count = radix.checked_pow(u32::try_from(length).ok()?)?;
        total = total.checked_add(count)?;
    }
    Some(total)
}

/// All labels of one length occupy a contiguous index range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LengthBucket {
    length: usize,
    start: u64,
    count: u64,
}

/// The deterministic, index-addressable sequence of candidate domains.
#[derive(Debug, Clone)]
pub struct CandidateSpace {
    alphabet: Vec<char>,
    tld: String,
    max_length: usize,
    buckets: Vec<LengthBucket>,
    total: u64,
}

impl CandidateSpace {
    /// Build the space for labels of length 3..=`max_length`.
    ///
    /// `max_length < 3` yields an empty space. Fails if the alphabet is
    /// empty or the number of candidates overflows `u64`.
    pub fn new(max_length: usize, alphabet: &[char], tld: &str) -> Result<Self, ProspectError> {
        if alphabet.is_empty() {
            return Err(ProspectError::invalid_alphabet(
                "",
                "alphabet cannot be empty",
            ));
        }

        let radix = alphabet.len() as u64;
        let mut buckets = Vec::new();
        let mut start: u64 = 0;

        for length in MIN_LABEL_LENGTH..=max_length {
            let count = u32::try_from(length)
                .ok()
                .and_then(|exp| radix.checked_pow(exp))
                .ok_or_else(|| overflow_error(max_length, alphabet.len()))?;
            buckets.push(LengthBucket {
                length,
                start,
                count,
            });
            start = start
                .checked_add(count)
                .ok_or_else(|| overflow_error(max_length, alphabet.len()))?;
        }

        Ok(Self {
            alphabet: alphabet.to_vec(),
            tld: tld.trim().trim_start_matches('.').to_string(),
            max_length,
            buckets,
            total: start,
        })
    }

    /// Total number of candidates.
    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn tld(&self) -> &str {
        &self.tld
    }

    /// Decode a generation index into its candidate.
    ///
    /// Returns `None` for indices past the end of the space.
    pub fn candidate_at(&self, index: u64) -> Option<Candidate> {
        let digits = self.decode(index)?;
        Some(Candidate {
            index,
            domain: self.render(&digits),
        })
    }

    /// Iterate over the whole space.
    pub fn iter(&self) -> Candidates<'_> {
        self.iter_from(0)
    }

    /// Iterate from `index` to the end of the space.
    ///
    /// Produces exactly the suffix that `iter().skip(index)` would.
    pub fn iter_from(&self, index: u64) -> Candidates<'_> {
        Candidates {
            space: self,
            next_index: index,
            digits: self.decode(index),
        }
    }

    /// Mixed-radix digits (alphabet positions) for `index`, most
    /// significant first.
    fn decode(&self, index: u64) -> Option<Vec<usize>> {
        let bucket = self
            .buckets
            .iter()
            .find(|b| index >= b.start && index - b.start < b.count)?;

        let radix = self.alphabet.len() as u64;
        let mut offset = index - bucket.start;
        let mut digits = vec![0usize; bucket.length];
        for slot in digits.iter_mut().rev() {
            *slot = (offset % radix) as usize;
            offset /= radix;
        }
        Some(digits)
    }

    fn render(&self, digits: &[usize]) -> String {
        let mut domain = String::with_capacity(digits.len() + self.tld.len() + 1);
        domain.extend(digits.iter().map(|&d| self.alphabet[d]));
        domain.push('.');
        domain.push_str(&self.tld);
        domain
    }
}

fn overflow_error(max_length: usize, radix: usize) -> ProspectError {
    ProspectError::config(format!(
        "candidate space for length {} over {} characters is too large to index",
        max_length, radix
    ))
}

/// Lazy iterator over a [`CandidateSpace`].
///
/// Decodes its starting index once, then advances odometer-style.
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    space: &'a CandidateSpace,
    next_index: u64,
    digits: Option<Vec<usize>>,
}

impl Candidates<'_> {
    /// Index of the candidate the next call to `next()` returns.
    pub fn position(&self) -> u64 {
        self.next_index
    }

    /// Advance the odometer (rightmost digit first). Rolling over every
    /// digit moves on to the next label length.
    fn advance(&mut self) {
        let radix = self.space.alphabet.len();
        let Some(digits) = self.digits.as_mut() else {
            return;
        };

        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if !carry {
                break;
            }
            *digit += 1;
            if *digit >= radix {
                *digit = 0;
            } else {
                carry = false;
            }
        }

        if carry {
            let next_length = digits.len() + 1;
            self.digits = if next_length <= self.space.max_length {
                Some(vec![0; next_length])
            } else {
                None
            };
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let digits = self.digits.as_ref()?;
        let candidate = Candidate {
            index: self.next_index,
            domain: self.space.render(digits),
        };
        self.next_index += 1;
        self.advance();
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.space.total.saturating_sub(self.next_index);
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ab() -> Vec<char> {
        vec!['a', 'b']
    }

    // ── Alphabet parsing ────────────────────────────────────────────

    #[test]
    fn test_alphabet_presets() {
        assert_eq!(parse_alphabet("letters").unwrap().len(), 26);
        assert_eq!(parse_alphabet("digits").unwrap().len(), 10);
        let alnum = parse_alphabet("alnum").unwrap();
        assert_eq!(alnum.len(), 36);
        assert_eq!(alnum[0], 'a');
        assert_eq!(alnum[26], '0');
    }

    #[test]
    fn test_alphabet_literal_preserves_order() {
        assert_eq!(parse_alphabet("zyx").unwrap(), vec!['z', 'y', 'x']);
        assert_eq!(parse_alphabet("a-9").unwrap(), vec!['a', '-', '9']);
    }

    #[test]
    fn test_alphabet_rejects_invalid() {
        assert!(parse_alphabet("").is_err());
        assert!(parse_alphabet("   ").is_err());
        assert!(parse_alphabet("ABC").is_err());
        assert!(parse_alphabet("a.b").is_err());
        assert!(parse_alphabet("ab c").is_err());
    }

    // ── Space size ──────────────────────────────────────────────────

    #[test]
    fn test_space_size_formula() {
        assert_eq!(space_size(3, 2), Some(8));
        assert_eq!(space_size(4, 2), Some(8 + 16));
        assert_eq!(space_size(5, 26), Some(26u64.pow(3) + 26u64.pow(4) + 26u64.pow(5)));
        assert_eq!(space_size(2, 26), Some(0));
    }

    #[test]
    fn test_space_size_overflow() {
        assert_eq!(space_size(40, 36), None);
        assert!(CandidateSpace::new(40, &parse_alphabet("alnum").unwrap(), "com").is_err());
    }

    #[test]
    fn test_short_max_length_is_empty() {
        let space = CandidateSpace::new(2, &ab(), "com").unwrap();
        assert!(space.is_empty());
        assert_eq!(space.iter().count(), 0);
        assert!(space.candidate_at(0).is_none());
    }

    #[test]
    fn test_empty_alphabet_rejected() {
        assert!(CandidateSpace::new(5, &[], "com").is_err());
    }

    // ── Enumeration ─────────────────────────────────────────────────

    #[test]
    fn test_three_letter_binary_space() {
        let space = CandidateSpace::new(3, &ab(), "com").unwrap();
        let names: Vec<String> = space.iter().map(|c| c.domain).collect();
        assert_eq!(
            names,
            vec![
                "aaa.com", "aab.com", "aba.com", "abb.com", "baa.com", "bab.com", "bba.com",
                "bbb.com"
            ]
        );
    }

    #[test]
    fn test_lengths_are_ordered_shortest_first() {
        let space = CandidateSpace::new(4, &ab(), "net").unwrap();
        let all: Vec<Candidate> = space.iter().collect();
        assert_eq!(all.len(), 24);
        assert_eq!(all[7].domain, "bbb.net");
        assert_eq!(all[8].domain, "aaaa.net");
        assert_eq!(all[23].domain, "bbbb.net");
    }

    #[test]
    fn test_indices_are_sequential_and_names_distinct() {
        let space = CandidateSpace::new(5, &['x', 'y', 'z'], "io").unwrap();
        let all: Vec<Candidate> = space.iter().collect();
        assert_eq!(all.len() as u64, space.len());
        assert_eq!(all.len(), 27 + 81 + 243);

        for (i, candidate) in all.iter().enumerate() {
            assert_eq!(candidate.index, i as u64);
        }

        let unique: HashSet<&str> = all.iter().map(|c| c.domain.as_str()).collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_enumeration_is_reproducible() {
        let first = CandidateSpace::new(4, &['q', 'r', 's'], "com").unwrap();
        let second = CandidateSpace::new(4, &['q', 'r', 's'], "com").unwrap();
        assert!(first.iter().eq(second.iter()));
    }

    #[test]
    fn test_alphabet_order_defines_radix_order() {
        let space = CandidateSpace::new(3, &['b', 'a'], "com").unwrap();
        let first = space.iter().next().unwrap();
        assert_eq!(first.domain, "bbb.com");
        assert_eq!(space.candidate_at(1).unwrap().domain, "bba.com");
    }

    #[test]
    fn test_tld_leading_dot_is_stripped() {
        let space = CandidateSpace::new(3, &ab(), ".org").unwrap();
        assert_eq!(space.tld(), "org");
        assert_eq!(space.candidate_at(0).unwrap().domain, "aaa.org");
    }

    // ── Resume ──────────────────────────────────────────────────────

    #[test]
    fn test_resume_matches_skip_for_every_index() {
        let space = CandidateSpace::new(5, &['a', 'b', 'c'], "com").unwrap();
        let full: Vec<Candidate> = space.iter().collect();

        for start in 0..=space.len() {
            let resumed: Vec<Candidate> = space.iter_from(start).collect();
            assert_eq!(resumed, full[start as usize..].to_vec(), "start={}", start);
        }
    }

    #[test]
    fn test_candidate_at_matches_iteration() {
        let space = CandidateSpace::new(4, &parse_alphabet("digits").unwrap(), "com").unwrap();
        for candidate in space.iter().step_by(97) {
            assert_eq!(space.candidate_at(candidate.index), Some(candidate));
        }
    }

    #[test]
    fn test_resume_past_end_is_empty() {
        let space = CandidateSpace::new(3, &ab(), "com").unwrap();
        assert_eq!(space.iter_from(8).count(), 0);
        assert_eq!(space.iter_from(1_000).count(), 0);
    }

    #[test]
    fn test_large_space_indexing_without_materializing() {
        let letters = parse_alphabet("letters").unwrap();
        let space = CandidateSpace::new(10, &letters, "com").unwrap();
        let last = space.candidate_at(space.len() - 1).unwrap();
        assert_eq!(last.domain, "zzzzzzzzzz.com");

        // First 4-letter name sits right after all 3-letter names
        let first_four = space.candidate_at(26u64.pow(3)).unwrap();
        assert_eq!(first_four.domain, "aaaa.com");

        let mut iter = space.iter_from(26u64.pow(3) - 1);
        assert_eq!(iter.next().unwrap().domain, "zzz.com");
        assert_eq!(iter.next().unwrap().domain, "aaaa.com");
        assert_eq!(iter.position(), 26u64.pow(3) + 1);
    }

    #[test]
    fn test_size_hint_counts_remaining() {
        let space = CandidateSpace::new(3, &ab(), "com").unwrap();
        let mut iter = space.iter_from(3);
        assert_eq!(iter.size_hint(), (5, Some(5)));
        iter.next();
        assert_eq!(iter.size_hint(), (4, Some(4)));
    }
}
