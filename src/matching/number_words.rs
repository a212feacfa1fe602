//! Rewrites spelled-out numbers ("twenty five", "fifth", "six million") as digits.
//!
//! Compound phrases are combined the usual English way: units and tens add,
//! `hundred` multiplies the running group, and a scale word (`thousand`,
//! `million`, ...) closes the group. A scale word directly after digits
//! ("6 million") multiplies those digits. Anything else is copied through.

use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+|[^A-Za-z]+").expect("Invalid regex pattern"));

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s-]+$").expect("Invalid regex pattern"));

static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.,])(\d+(?:\.\d+)?)\s*$").expect("Invalid regex pattern")
});

#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberWord {
    /// 0-9
    Unit(f64),
    /// 10-19
    Teen(f64),
    /// 20, 30, ... 90
    Tens(f64),
    Hundred,
    /// thousand and up
    Scale(f64),
    /// Digits already present in the text, seeding a scale word.
    Digits(f64),
}

use NumberWord::*;

const CARDINALS: &[(&str, NumberWord)] = &[
    ("zero", Unit(0.0)),
    ("one", Unit(1.0)),
    ("two", Unit(2.0)),
    ("three", Unit(3.0)),
    ("four", Unit(4.0)),
    ("five", Unit(5.0)),
    ("six", Unit(6.0)),
    ("seven", Unit(7.0)),
    ("eight", Unit(8.0)),
    ("nine", Unit(9.0)),
    ("ten", Teen(10.0)),
    ("eleven", Teen(11.0)),
    ("twelve", Teen(12.0)),
    ("thirteen", Teen(13.0)),
    ("fourteen", Teen(14.0)),
    ("fifteen", Teen(15.0)),
    ("sixteen", Teen(16.0)),
    ("seventeen", Teen(17.0)),
    ("eighteen", Teen(18.0)),
    ("nineteen", Teen(19.0)),
    ("twenty", Tens(20.0)),
    ("thirty", Tens(30.0)),
    ("forty", Tens(40.0)),
    ("fifty", Tens(50.0)),
    ("sixty", Tens(60.0)),
    ("seventy", Tens(70.0)),
    ("eighty", Tens(80.0)),
    ("ninety", Tens(90.0)),
    ("hundred", Hundred),
    ("thousand", Scale(1e3)),
    ("million", Scale(1e6)),
    ("billion", Scale(1e9)),
    ("trillion", Scale(1e12)),
];

const ORDINALS: &[(&str, NumberWord)] = &[
    ("first", Unit(1.0)),
    ("second", Unit(2.0)),
    ("third", Unit(3.0)),
    ("fourth", Unit(4.0)),
    ("fifth", Unit(5.0)),
    ("sixth", Unit(6.0)),
    ("seventh", Unit(7.0)),
    ("eighth", Unit(8.0)),
    ("ninth", Unit(9.0)),
    ("tenth", Teen(10.0)),
    ("eleventh", Teen(11.0)),
    ("twelfth", Teen(12.0)),
    ("thirteenth", Teen(13.0)),
    ("fourteenth", Teen(14.0)),
    ("fifteenth", Teen(15.0)),
    ("sixteenth", Teen(16.0)),
    ("seventeenth", Teen(17.0)),
    ("eighteenth", Teen(18.0)),
    ("nineteenth", Teen(19.0)),
    ("twentieth", Tens(20.0)),
    ("thirtieth", Tens(30.0)),
    ("fortieth", Tens(40.0)),
    ("fiftieth", Tens(50.0)),
    ("sixtieth", Tens(60.0)),
    ("seventieth", Tens(70.0)),
    ("eightieth", Tens(80.0)),
    ("ninetieth", Tens(90.0)),
    ("hundredth", Hundred),
    ("thousandth", Scale(1e3)),
    ("millionth", Scale(1e6)),
    ("billionth", Scale(1e9)),
    ("trillionth", Scale(1e12)),
];

/// Returns the number word and whether it is an ordinal.
fn lookup(token: &str) -> Option<(NumberWord, bool)> {
    let lower = token.to_ascii_lowercase();
    let find = |table: &[(&str, NumberWord)]| {
        table
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, word)| *word)
    };
    find(CARDINALS)
        .map(|w| (w, false))
        .or_else(|| find(ORDINALS).map(|w| (w, true)))
}

#[derive(Debug, Default)]
struct NumberPhrase {
    total: f64,
    current: f64,
    last: Option<NumberWord>,
    last_scale: Option<f64>,
}

impl NumberPhrase {
    /// Whether `word` continues this phrase rather than starting a new number.
    fn accepts(&self, word: NumberWord) -> bool {
        let smaller_scale = |s: f64| self.last_scale.map_or(true, |prev| s < prev);
        match (self.last, word) {
            (None, _) => true,
            (Some(Unit(_) | Teen(_) | Digits(_)), Hundred) => true,
            (Some(Unit(_) | Teen(_) | Tens(_) | Hundred | Digits(_)), Scale(s)) => smaller_scale(s),
            (Some(Tens(_)), Unit(_)) => true,
            (Some(Hundred | Scale(_)), Unit(_) | Teen(_) | Tens(_)) => true,
            _ => false,
        }
    }

    fn push(&mut self, word: NumberWord) {
        match word {
            Unit(v) | Teen(v) | Tens(v) | Digits(v) => self.current += v,
            Hundred => self.current = self.current.max(1.0) * 100.0,
            Scale(s) => {
                self.total += self.current.max(1.0) * s;
                self.current = 0.0;
                self.last_scale = Some(s);
            }
        }
        self.last = Some(word);
    }

    fn value(&self) -> f64 {
        self.total + self.current
    }
}

/// Byte offset and value of a plain number ending `text` ("over 6 " -> 6).
fn trailing_number(text: &str) -> Option<(usize, f64)> {
    let digits = TRAILING_NUMBER.captures(text)?.get(1)?;
    let value = digits.as_str().parse().ok()?;
    Some((digits.start(), value))
}

/// Index, word and ordinal flag of the token continuing the phrase that
/// currently ends at `tokens[end]`, if any.
fn next_word(tokens: &[&str], end: usize, phrase: &NumberPhrase) -> Option<(usize, NumberWord, bool)> {
    let is_separator = |i: usize| tokens.get(i).is_some_and(|t| SEPARATOR.is_match(t));
    if !is_separator(end + 1) {
        return None;
    }
    let candidate = tokens.get(end + 2)?;
    if let Some((word, ordinal)) = lookup(candidate) {
        return phrase.accepts(word).then_some((end + 2, word, ordinal));
    }
    // "one hundred and five", "two thousand and twenty"
    if candidate.eq_ignore_ascii_case("and")
        && matches!(phrase.last, Some(Hundred | Scale(_)))
        && is_separator(end + 3)
    {
        let (word, ordinal) = lookup(tokens.get(end + 4)?)?;
        if matches!(word, Unit(_) | Teen(_) | Tens(_)) && phrase.accepts(word) {
            return Some((end + 4, word, ordinal));
        }
    }
    None
}

/// Replace every spelled-out number in `text` with its digits.
pub fn words_to_digits(text: &str) -> String {
    let tokens: Vec<&str> = TOKEN.find_iter(text).map(|m| m.as_str()).collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < tokens.len() {
        let Some((first, ordinal)) = lookup(tokens[i]) else {
            out.push_str(tokens[i]);
            i += 1;
            continue;
        };

        let mut phrase = NumberPhrase::default();
        if matches!(first, Hundred | Scale(_)) {
            if let Some((start, seed)) = trailing_number(&out) {
                out.truncate(start);
                phrase.push(Digits(seed));
            }
        }
        phrase.push(first);

        let mut end = i;
        let mut closed = ordinal;
        while !closed {
            match next_word(&tokens, end, &phrase) {
                Some((idx, word, is_ordinal)) => {
                    phrase.push(word);
                    end = idx;
                    closed = is_ordinal;
                }
                None => break,
            }
        }

        out.push_str(&phrase.value().to_string());
        i = end + 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_words() {
        assert_eq!(words_to_digits("eight"), "8");
        assert_eq!(words_to_digits("Twelve"), "12");
        assert_eq!(words_to_digits("zero"), "0");
    }

    #[test]
    fn compound_tens() {
        assert_eq!(words_to_digits("twenty five"), "25");
        assert_eq!(words_to_digits("twenty-two"), "22");
        assert_eq!(words_to_digits("Ninety Nine"), "99");
    }

    #[test]
    fn ordinals() {
        assert_eq!(words_to_digits("fifth title"), "5 title");
        assert_eq!(words_to_digits("fifty-first state"), "51 state");
        // An ordinal closes the number
        assert_eq!(words_to_digits("first two"), "1 2");
    }

    #[test]
    fn hundreds_and_scales() {
        assert_eq!(words_to_digits("one hundred and five"), "105");
        assert_eq!(words_to_digits("nineteen hundred eighty four"), "1984");
        assert_eq!(words_to_digits("two thousand and twenty"), "2020");
        assert_eq!(words_to_digits("one million two hundred thousand"), "1200000");
        assert_eq!(words_to_digits("six million"), "6000000");
        assert_eq!(words_to_digits("thousand"), "1000");
    }

    #[test]
    fn scale_after_digits() {
        assert_eq!(words_to_digits("over 6 million"), "over 6000000");
        assert_eq!(words_to_digits("1.5 million people"), "1500000 people");
    }

    #[test]
    fn adjacent_units_stay_separate() {
        assert_eq!(words_to_digits("one two three"), "1 2 3");
    }

    #[test]
    fn non_number_text_is_untouched() {
        assert_eq!(words_to_digits("607 islands and islets"), "607 islands and islets");
        assert_eq!(words_to_digits("someone tense"), "someone tense");
        assert_eq!(words_to_digits(""), "");
        assert_eq!(words_to_digits("five and dime"), "5 and dime");
    }
}
