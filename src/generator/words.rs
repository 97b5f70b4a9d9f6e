//! Dictionary-based name synthesis.
//!
//! Names are built from three word lists:
//!
//! - `words-base.txt`: nouns as `word/gender`, gender one of `m`, `f`, `i`
//! - `words-adjective.txt`: adjectives as `masculine[/feminine-ending[/neuter-ending]]`
//! - `words-of-which.txt`: genitive qualifiers ("мешок **муки**")
//!
//! Missing files fall back to small built-in lists.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ExchangeError, Result};

const BASE_FALLBACK: &[&str] = &[
    "стол/m", "шкаф/m", "диван/m", "лампа/f", "полка/f", "ваза/f", "кресло/i", "зеркало/i",
    "покрывало/i", "коврик/m",
];
const ADJECTIVE_FALLBACK: &[&str] = &[
    "красный", "новый", "большой", "синий/яя/ее", "деревянный", "мягкий/ая/ое", "старинный",
    "компактный",
];
const OF_WHICH_FALLBACK: &[&str] = &["дуба", "сосны", "стекла", "металла", "бабушки", "мастера"];

/// Phrase structures and their weights.
///
/// `a` adjective (at most twice), `b` base noun (exactly once), `w` qualifier.
const STRUCTURES: &[(&str, u32)] = &[
    ("b", 1),
    ("bw", 15),
    ("wb", 10),
    ("ab", 20),
    ("ba", 15),
    ("abw", 30),
    ("aab", 30),
    ("bwa", 20),
    ("aabw", 25),
];

/// Grammatical gender of a base noun
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    /// `m`
    Masculine,
    /// `f`
    Feminine,
    /// `i`
    Neuter,
}

impl Gender {
    fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "f" => Gender::Feminine,
            "i" | "n" => Gender::Neuter,
            _ => Gender::Masculine,
        }
    }
}

/// Inflect an adjective entry for `gender`.
///
/// The masculine form is the first `/`-separated field. Feminine and neuter
/// replace as many trailing characters as their ending has, defaulting to
/// `ая` and `ое`.
pub fn inflect(entry: &str, gender: Gender) -> String {
    let mut forms = entry.split('/');
    let masculine = forms.next().unwrap_or_default();
    let feminine = forms.next().unwrap_or("ая");
    let neuter = forms.next().unwrap_or("ое");

    let ending = match gender {
        Gender::Masculine => return masculine.to_string(),
        Gender::Feminine => feminine,
        Gender::Neuter => neuter,
    };

    let keep = masculine.chars().count().saturating_sub(ending.chars().count());
    masculine.chars().take(keep).chain(ending.chars()).collect()
}

/// Word lists for name synthesis
#[derive(Debug, Clone)]
pub struct Dictionaries {
    base: Vec<(String, Gender)>,
    adjectives: Vec<String>,
    of_which: Vec<String>,
}

impl Default for Dictionaries {
    fn default() -> Self {
        Self::from_lists(
            BASE_FALLBACK.iter().map(ToString::to_string).collect(),
            ADJECTIVE_FALLBACK.iter().map(ToString::to_string).collect(),
            OF_WHICH_FALLBACK.iter().map(ToString::to_string).collect(),
        )
    }
}

impl Dictionaries {
    /// Load word lists from `dir`, using built-in lists for missing files
    pub fn load(dir: &Path) -> Result<Self> {
        let fallback = Self::default();

        let base = read_list(&dir.join("words-base.txt"))?
            .map(|lines| lines.iter().map(|l| parse_base(l)).collect())
            .unwrap_or(fallback.base);
        let adjectives = read_list(&dir.join("words-adjective.txt"))?.unwrap_or(fallback.adjectives);
        let of_which = read_list(&dir.join("words-of-which.txt"))?.unwrap_or(fallback.of_which);

        if base.is_empty() {
            return Err(ExchangeError::Generator("words-base.txt has no words".to_string()));
        }

        Ok(Self {
            base,
            adjectives,
            of_which,
        })
    }

    /// Build from explicit lists
    pub fn from_lists(base: Vec<String>, adjectives: Vec<String>, of_which: Vec<String>) -> Self {
        Self {
            base: base.iter().map(|l| parse_base(l)).collect(),
            adjectives,
            of_which,
        }
    }

    /// Phrase following `structure`, first letter capitalized, rest lowercase
    pub fn phrase<R: Rng + ?Sized>(&self, rng: &mut R, structure: &str) -> String {
        let (base, gender) = self
            .base
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| ("товар".to_string(), Gender::Masculine));
        let mut adjectives: Vec<String> = (0..2)
            .filter_map(|_| self.adjectives.choose(rng))
            .map(|a| inflect(a, gender))
            .collect();
        let which = self.of_which.choose(rng).cloned().unwrap_or_default();

        let words: Vec<String> = structure
            .chars()
            .filter_map(|c| match c {
                'b' => Some(base.clone()),
                'a' => adjectives.pop(),
                'w' => Some(which.clone()),
                _ => None,
            })
            .filter(|w| !w.is_empty())
            .collect();

        capitalize(&words.join(" "))
    }

    /// Phrase with a randomly weighted structure
    pub fn random_phrase<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let structure = STRUCTURES
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(s, _)| *s)
            .unwrap_or("abw");
        self.phrase(rng, structure)
    }
}

fn parse_base(line: &str) -> (String, Gender) {
    match line.split_once('/') {
        Some((word, tag)) => (word.trim().to_string(), Gender::from_tag(tag)),
        None => (line.trim().to_string(), Gender::Masculine),
    }
}

fn read_list(path: &Path) -> Result<Option<Vec<String>>> {
    if !path.exists() {
        tracing::debug!("{} not found, using built-in words", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ExchangeError::Generator(format!("Failed to read {}: {e}", path.display()))
    })?;
    Ok(Some(
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
    ))
}

fn capitalize(phrase: &str) -> String {
    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
