use anyhow::Result;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::models::{Boundary, FrequencyEntry};

fn literal_pattern(needle: &str, boundary: Boundary) -> String {
    let escaped = regex::escape(needle);
    match boundary {
        Boundary::Word => format!(r"\b{}\b", escaped),
        Boundary::Unanchored => escaped,
    }
}

/// Count each declared variant, case-sensitively, in declared order.
///
/// Every variant gets an entry, zero when absent. Matches are leftmost and
/// non-overlapping, like a regex find-all.
pub fn count_variants<S: AsRef<str>>(
    text: &str,
    variants: &[S],
    boundary: Boundary,
) -> Result<Vec<FrequencyEntry>> {
    variants
        .iter()
        .map(|v| {
            let v = v.as_ref();
            if v.is_empty() {
                return Ok(FrequencyEntry::new(v, 0));
            }
            let re = Regex::new(&literal_pattern(v, boundary))?;
            Ok(FrequencyEntry::new(v, re.find_iter(text).count() as u64))
        })
        .collect()
}

/// Case-insensitive search for `keyword`, reporting each surface form seen.
///
/// Sorted by count descending; equal counts keep first-seen order.
pub fn discover_variants(text: &str, keyword: &str) -> Result<Vec<FrequencyEntry>> {
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    let re = RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()?;

    let mut found: Vec<FrequencyEntry> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for m in re.find_iter(text) {
        match index.get(m.as_str()) {
            Some(&i) => found[i].count += 1,
            None => {
                index.insert(m.as_str(), found.len());
                found.push(FrequencyEntry::new(m.as_str(), 1));
            }
        }
    }

    sort_by_count(&mut found);
    Ok(found)
}

/// Stable descending sort by count.
pub fn sort_by_count(entries: &mut [FrequencyEntry]) {
    entries.sort_by(|a, b| b.count.cmp(&a.count));
}
