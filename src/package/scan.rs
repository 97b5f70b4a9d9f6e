//! Image reference scan.

use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    // ASCII-only pattern, so it matches in windows-1251 and UTF-8 documents alike
    static ref IMAGE_REF: Regex = Regex::new(r"(?i-u)\b(\d+\.jpg)\b").unwrap();
    static ref STAGED_IMAGE: regex::Regex = regex::Regex::new(r"(?i)^\d+\.jpg$").unwrap();
}

/// Image file names referenced by a document, deduplicated in first-seen order
pub fn scan_image_refs(xml: &[u8]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for caps in IMAGE_REF.captures_iter(xml) {
        let name = String::from_utf8_lossy(&caps[1]).into_owned();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    names
}

/// Whether `name` looks like a staged image asset (`<digits>.jpg`)
pub fn is_image_name(name: &str) -> bool {
    STAGED_IMAGE.is_match(name)
}
