//! Compensation statements.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::NOT_MENTIONED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SalaryKind {
    /// Range with optional currency and optional annual unit.
    Range,
    /// Single rate or range with an hour unit.
    Hourly,
    /// Single figure with an explicit annual unit.
    Annual,
}

struct SalaryRule {
    re: Regex,
    kind: SalaryKind,
}

const CUR: &str = r"\$|USD|CAD|C\$";
// `k` shorthand first so "110k" is not cut to "110"
const AMOUNT: &str = r"\d+k|\d{2,3}(?:,\d{3})?";
const YEAR_UNIT: &str = r"per\s*year|/year|year|annum|annual";
const HOUR_UNIT: &str = r"per\s*hour|/hour|hour|hr|/hr";

static RULES: LazyLock<Vec<SalaryRule>> = LazyLock::new(|| {
    let rule = |pat: String, kind| SalaryRule {
        re: Regex::new(&format!("(?i){pat}")).unwrap(),
        kind,
    };
    vec![
        rule(
            format!(
                r"(?P<cur>{CUR})?\s?(?P<a>{AMOUNT})\s*(?:-|–|to)\s*(?P<cur2>{CUR})?\s?(?P<b>{AMOUNT})(?:\s*(?P<unit>{YEAR_UNIT})\b)?"
            ),
            SalaryKind::Range,
        ),
        rule(
            format!(r"(?P<cur>{CUR})?\s?(?P<a>\d{{1,3}})(?:\s*(?:-|–|to)\s*(?P<b>\d{{1,3}}))?\s*(?P<unit>{HOUR_UNIT})\b"),
            SalaryKind::Hourly,
        ),
        rule(
            format!(r"(?P<cur>{CUR})?\s?(?P<a>{AMOUNT})\s*(?P<unit>{YEAR_UNIT})\b"),
            SalaryKind::Annual,
        ),
    ]
});

/// A bare range followed by one of these is experience or an hourly rate, not annual pay.
static RANGE_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*(?:years?|yrs?|{HOUR_UNIT})\b")).unwrap()
});

/// First category with an acceptable match wins; later categories are not consulted.
pub fn extract_salary(text: &str) -> String {
    for rule in RULES.iter() {
        let hit = rule
            .re
            .captures_iter(text)
            .find(|caps| accept(rule.kind, text, caps));
        if let Some(caps) = hit {
            return compose(&caps);
        }
    }
    NOT_MENTIONED.to_string()
}

fn accept(kind: SalaryKind, text: &str, caps: &Captures) -> bool {
    let Some(a) = caps.name("a") else {
        return false;
    };
    let last = caps.name("b").unwrap_or(a);
    // amounts must not be cut out of a longer number
    if text[..a.start()].ends_with(|c: char| c.is_ascii_digit() || c == ',') {
        return false;
    }
    if text[last.end()..].starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    if kind == SalaryKind::Range && caps.name("unit").is_none() {
        let end = caps.get(0).map_or(last.end(), |m| m.end());
        return !RANGE_TAIL_RE.is_match(&text[end..]);
    }
    true
}

fn compose(caps: &Captures) -> String {
    let cur = caps
        .name("cur")
        .or_else(|| caps.name("cur2"))
        .map(|m| canonical_currency(m.as_str()))
        .unwrap_or_default();
    let low = caps.name("a").map(|m| format_money(m.as_str())).unwrap_or_default();
    let core = match caps.name("b") {
        Some(b) => format!("{cur} {low} – {}", format_money(b.as_str())),
        None => format!("{cur} {low}"),
    };
    let unit = caps
        .name("unit")
        .map(|m| canonical_unit(m.as_str()))
        .unwrap_or_default();
    format!("{} {unit}", core.trim()).trim().to_string()
}

fn canonical_currency(cur: &str) -> &'static str {
    match cur.to_ascii_uppercase().as_str() {
        "CAD" | "C$" => "CAD",
        _ => "$",
    }
}

fn canonical_unit(unit: &str) -> &'static str {
    let u = unit.to_lowercase();
    if u.contains("hour") || u.contains("hr") {
        "per hour"
    } else if u.contains("year") || u.contains("annum") || u.contains("annual") {
        "per year"
    } else {
        ""
    }
}

/// `"80,000"` -> `"80,000"`, `"95k"` -> `"95,000"`, `"45"` -> `"45"`.
pub fn format_money(token: &str) -> String {
    let s = token.trim().to_lowercase().replace(',', "");
    if s.is_empty() {
        return String::new();
    }
    let value = match s.strip_suffix('k') {
        Some(n) => n.parse::<u64>().ok().and_then(|v| v.checked_mul(1000)),
        None => s.parse::<u64>().ok(),
    };
    value.map(group_thousands).unwrap_or_else(|| token.to_string())
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annual_range() {
        let s = extract_salary("Pay: $80,000 - $100,000 per year plus bonus");
        assert_eq!(s, "$ 80,000 – 100,000 per year");
    }

    #[test]
    fn range_without_unit() {
        assert_eq!(extract_salary("CAD 90k to 110k DOE"), "CAD 90,000 – 110,000");
        assert_eq!(extract_salary("C$70,000-85,000"), "CAD 70,000 – 85,000");
    }

    #[test]
    fn hourly() {
        assert_eq!(extract_salary("$45/hour"), "$ 45 per hour");
        assert_eq!(extract_salary("USD 30-40 per hour"), "$ 30 – 40 per hour");
        assert_eq!(extract_salary("paid 55 hr"), "55 per hour");
    }

    #[test]
    fn single_annual() {
        assert_eq!(extract_salary("up to $120k per annum"), "$ 120,000 per year");
        assert_eq!(extract_salary("95,000/year"), "95,000 per year");
    }

    #[test]
    fn range_outranks_hourly_elsewhere() {
        let text = "$25/hour for interns; full-time $90k-$110k";
        assert_eq!(extract_salary(text), "$ 90,000 – 110,000");
    }

    #[test]
    fn experience_ranges_are_not_pay() {
        assert_eq!(extract_salary("10-15 years of experience"), NOT_MENTIONED);
        assert_eq!(
            extract_salary("10-15 years of experience, $130,000 per year"),
            "$ 130,000 per year"
        );
    }

    #[test]
    fn years_are_not_ranges() {
        assert_eq!(extract_salary("Founded 2012-2015 in Ottawa"), NOT_MENTIONED);
    }

    #[test]
    fn no_salary() {
        assert_eq!(extract_salary("Competitive compensation and benefits"), NOT_MENTIONED);
        assert_eq!(extract_salary(""), NOT_MENTIONED);
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money("80,000"), "80,000");
        assert_eq!(format_money("95k"), "95,000");
        assert_eq!(format_money("1500k"), "1,500,000");
        assert_eq!(format_money("45"), "45");
    }

    #[test]
    fn oversized_amounts_kept_verbatim() {
        assert_eq!(format_money("99999999999999999k"), "99999999999999999k");
        assert_eq!(format_money("123456789012345678901234k"), "123456789012345678901234k");
        assert_eq!(
            extract_salary("Budget $99999999999999999k per year"),
            "$ 99999999999999999k per year"
        );
    }
}
