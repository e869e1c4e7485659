//! Required years of experience.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::NOT_MENTIONED;

/// How a matched phrase is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YearsForm {
    Range,
    Plus,
    AtLeast,
    Minimum,
    Over,
    Plain,
    /// "Experience: 6+ Years", open-ended only when the `+` is present.
    Labelled,
}

struct YearRule {
    re: Regex,
    form: YearsForm,
}

const UNIT: &str = r"(?:years?|yrs?)";

static RULES: LazyLock<Vec<YearRule>> = LazyLock::new(|| {
    let rule = |pat: String, form| YearRule {
        re: Regex::new(&format!("(?i){pat}")).unwrap(),
        form,
    };
    vec![
        rule(format!(r"\b(\d{{1,2}})\s*(?:-|–|to|or)\s*(\d{{1,2}})\s*\+?\s*{UNIT}\b"), YearsForm::Range),
        rule(format!(r"\b(\d{{1,2}})\s*(?:\+|plus)\s*{UNIT}\b"), YearsForm::Plus),
        rule(format!(r"\b(\d{{1,2}})\s*{UNIT}\s*\+\B"), YearsForm::Plus),
        rule(format!(r"\bat\s+least\s+(\d{{1,2}})\s*{UNIT}\b"), YearsForm::AtLeast),
        rule(format!(r"\bmin(?:imum)?\s+(?:of\s+)?(\d{{1,2}})\s*{UNIT}\b"), YearsForm::Minimum),
        rule(format!(r"\b(?:over|more\s+than)\s+(\d{{1,2}})\s*{UNIT}\b"), YearsForm::Over),
        rule(format!(r"\b(\d{{1,2}})\s*{UNIT}\s+of\s+[^.\n]*?\bexperience\b"), YearsForm::Plain),
        rule(format!(r"\b(\d{{1,2}})\s*{UNIT}\s*['’]?\s*experience\b"), YearsForm::Plain),
        rule(format!(r"\bexperience\s*[:\-]\s*(\d{{1,2}})\s*(\+)?\s*{UNIT}\b"), YearsForm::Labelled),
    ]
});

fn canonical(form: YearsForm, caps: &Captures) -> Option<String> {
    let n = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let phrase = match form {
        YearsForm::Range => {
            let hi = caps.get(2)?.as_str().parse::<u32>().ok()?;
            format!("{n}–{hi} years")
        }
        YearsForm::Plus => format!("{n}+ years"),
        YearsForm::AtLeast => format!("at least {n} years"),
        YearsForm::Minimum => format!("minimum {n} years"),
        YearsForm::Over => format!("over {n} years"),
        YearsForm::Plain => format!("{n} years"),
        YearsForm::Labelled if caps.get(2).is_some() => format!("{n}+ years"),
        YearsForm::Labelled => format!("{n} years"),
    };
    Some(phrase)
}

fn is_open_or_range(phrase: &str) -> bool {
    phrase.contains('–') || phrase.contains('+')
}

/// All distinct canonical phrases with their earliest position, in text order.
pub fn year_mentions(text: &str) -> Vec<(usize, String)> {
    let mut earliest: HashMap<String, usize> = HashMap::new();
    for rule in RULES.iter() {
        for caps in rule.re.captures_iter(text) {
            let Some(phrase) = canonical(rule.form, &caps) else {
                continue;
            };
            let pos = caps.get(0).map_or(0, |m| m.start());
            earliest
                .entry(phrase)
                .and_modify(|p| *p = (*p).min(pos))
                .or_insert(pos);
        }
    }
    let mut found: Vec<(usize, String)> = earliest.into_iter().map(|(s, p)| (p, s)).collect();
    found.sort();
    found
}

/// Ranges and open-ended requirements outrank plain mentions wherever they appear.
pub fn extract_years(text: &str) -> String {
    let found = year_mentions(text);
    found
        .iter()
        .find(|(_, s)| is_open_or_range(s))
        .or_else(|| found.first())
        .map(|(_, s)| s.clone())
        .unwrap_or_else(|| NOT_MENTIONED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range() {
        assert_eq!(extract_years("5-10 years"), "5–10 years");
        assert_eq!(extract_years("Requires 3 to 5 yrs in backend"), "3–5 years");
    }

    #[test]
    fn open_ended() {
        assert_eq!(extract_years("3+ years"), "3+ years");
        assert_eq!(extract_years("4 plus years of Java"), "4+ years");
        assert_eq!(extract_years("7 years+ in industry"), "7+ years");
        assert_eq!(extract_years("Experience: 6+ Years"), "6+ years");
    }

    #[test]
    fn qualifiers() {
        assert_eq!(extract_years("at least 2 years"), "at least 2 years");
        assert_eq!(extract_years("Minimum of 4 years"), "minimum 4 years");
        assert_eq!(extract_years("more than 8 years"), "over 8 years");
    }

    #[test]
    fn experience_context() {
        assert_eq!(extract_years("2 years of professional experience"), "2 years");
        assert_eq!(extract_years("4 years' experience required"), "4 years");
        assert_eq!(extract_years("Experience: 3 years"), "3 years");
    }

    #[test]
    fn plus_wins_over_earlier_plain() {
        let text = "2 years of experience with SQL. Overall 5+ years in software.";
        assert_eq!(extract_years(text), "5+ years");
    }

    #[test]
    fn earliest_plain_when_no_open_value() {
        let text = "at least 2 years in Python and 6 years of experience overall";
        assert_eq!(extract_years(text), "at least 2 years");
    }

    #[test]
    fn c_plus_plus_does_not_make_plus() {
        assert_eq!(extract_years("5 years of C++ experience"), "5 years");
    }

    #[test]
    fn nothing_found() {
        assert_eq!(extract_years(""), NOT_MENTIONED);
        assert_eq!(extract_years("We are a year-round team of 120"), NOT_MENTIONED);
    }

    #[test]
    fn mentions_are_distinct_and_ordered() {
        let m = year_mentions("3+ years here, 3+ years again, at least 1 year");
        assert_eq!(
            m,
            vec![(0, "3+ years".to_string()), (31, "at least 1 years".to_string())]
        );
    }
}
