//! Display language of the feed: event labels, titles and name collation.

use std::{fmt, str::FromStr};

use crate::{
    error::{Error, Result},
    person::EventKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Croatian,
    German,
    English,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Croatian, Language::German, Language::English];

    /// The ISO 639-1 code, also used for the Wikidata label service.
    pub fn code(self) -> &'static str {
        match self {
            Language::Croatian => "hr",
            Language::German => "de",
            Language::English => "en",
        }
    }

    pub fn label(self, kind: EventKind) -> &'static str {
        match (self, kind) {
            (Language::Croatian, EventKind::Birth) => "Rođendan",
            (Language::Croatian, EventKind::Death) => "Obljetnica smrti",
            (Language::German, EventKind::Birth) => "Geburtstag",
            (Language::German, EventKind::Death) => "Todestag",
            (Language::English, EventKind::Birth) => "Birthday",
            (Language::English, EventKind::Death) => "Death anniversary",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            Language::Croatian => "Kulturni kalendar",
            Language::German => "Kulturkalender",
            Language::English => "Cultural calendar",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Language::Croatian => "Rođendani i obljetnice smrti poznatih umjetnika, prema Wikidati",
            Language::German => "Geburts- und Todestage bekannter Kulturschaffender, nach Wikidata",
            Language::English => "Birthdays and death anniversaries of notable artists, from Wikidata",
        }
    }

    /// A key that orders names the way a reader of this language expects.
    ///
    /// Letters are compared case-insensitively. Every letter maps to
    /// `base * 4 + rank`, where `rank` is non-zero only for letters the
    /// language treats as separate letters of its alphabet.
    pub fn collation_key(self, name: &str) -> Vec<u32> {
        let chars: Vec<char> = name.chars().flat_map(char::to_lowercase).collect();
        let mut key = Vec::with_capacity(chars.len());
        let mut index = 0;
        while index < chars.len() {
            let current = chars[index];
            let next = chars.get(index + 1).copied();
            if self == Language::Croatian {
                let digraph = match (current, next) {
                    ('d', Some('ž')) => Some(weight('d', 1)),
                    ('l', Some('j')) => Some(weight('l', 1)),
                    ('n', Some('j')) => Some(weight('n', 1)),
                    _ => None,
                };
                if let Some(digraph) = digraph {
                    key.push(digraph);
                    index += 2;
                    continue;
                }
            }
            match (self, current) {
                (Language::Croatian, 'č') => key.push(weight('c', 1)),
                (Language::Croatian, 'ć') => key.push(weight('c', 2)),
                (Language::Croatian, 'đ') => key.push(weight('d', 2)),
                (Language::Croatian, 'š') => key.push(weight('s', 1)),
                (Language::Croatian, 'ž') => key.push(weight('z', 1)),
                (_, 'ß') => key.extend([weight('s', 0), weight('s', 0)]),
                (_, 'æ') => key.extend([weight('a', 0), weight('e', 0)]),
                (_, 'œ') => key.extend([weight('o', 0), weight('e', 0)]),
                (_, letter) => key.push(weight(fold(letter), 0)),
            }
            index += 1;
        }
        key
    }
}

fn weight(base: char, rank: u32) -> u32 {
    u32::from(base) * 4 + rank
}

/// Strip the diacritic from common Latin letters.
fn fold(letter: char) -> char {
    match letter {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' | 'ð' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' | 'ș' => 's',
        'ţ' | 'ť' | 'ŧ' | 'ț' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|language| language.code() == code)
            .ok_or_else(|| {
                let supported: Vec<&str> = Language::ALL.iter().map(|l| l.code()).collect();
                Error::Configuration(format!(
                    "unsupported language `{s}`, expected one of {}",
                    supported.join(", ")
                ))
            })
    }
}
