//! Skill keywords: a fixed vocabulary plus free-form "experience with ..." fragments.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_VOCABULARY: &[&str] = &[
    // languages
    "python", "java", "javascript", "typescript", "c#", ".net", ".net core", "c++", "go",
    "golang", "rust", "ruby", "php", "kotlin", "swift",
    // web/frontend
    "react", "react native", "vue", "angular", "next.js", "nuxt", "svelte", "tailwind",
    "webpack", "babel", "html", "css", "sass", "less",
    // backend/frameworks
    "spring", "spring boot", "django", "flask", "fastapi", "express", "node.js", "nodejs",
    "graphql", "rest", "grpc", "microservices",
    // data/storage
    "sql", "mysql", "postgresql", "postgres", "mariadb", "oracle", "mongodb", "dynamodb",
    "redis", "elasticsearch", "kafka", "rabbitmq", "spark", "hadoop", "hive", "airflow",
    "snowflake", "bigquery", "redshift", "databricks", "power bi", "tableau", "pandas", "numpy",
    // cloud/devops
    "aws", "azure", "gcp", "docker", "kubernetes", "terraform", "ansible", "jenkins",
    "github actions", "gitlab ci", "ci/cd", "linux",
    // testing
    "pytest", "junit", "selenium", "cypress", "playwright", "jest", "mocha",
    // security
    "oauth", "oidc", "sso",
    // process
    "jira", "agile", "scrum",
];

static LEAD_IN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:experience\s+with|proficien(?:t|cy)\s+in|knowledge\s+of|familiar\s+with|hands[- ]on\s+with|expertise\s+in)\s+([A-Za-z0-9.+#/\-,; ]{2,80})",
    )
    .unwrap()
});
static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i),|/| and |\bor\b|;").unwrap());
static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

const MIN_FRAGMENT: usize = 2;
const MAX_FRAGMENT: usize = 40;

#[derive(Debug, Clone)]
struct Term {
    name: String,
    re: Regex,
}

/// Compiled vocabulary. Cheap to clone; regexes are shared.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<Term>,
}

impl Vocabulary {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self, regex::Error> {
        let mut vocab = Vocabulary { terms: Vec::new() };
        vocab.push_all(terms)?;
        Ok(vocab)
    }

    /// This vocabulary plus caller terms it does not already contain.
    pub fn extended<S: AsRef<str>>(&self, extra: &[S]) -> Result<Self, regex::Error> {
        let mut vocab = self.clone();
        vocab.push_all(extra)?;
        Ok(vocab)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn push_all<S: AsRef<str>>(&mut self, terms: &[S]) -> Result<(), regex::Error> {
        for raw in terms {
            let name = raw.as_ref().trim().to_lowercase();
            if name.is_empty() || self.terms.iter().any(|t| t.name == name) {
                continue;
            }
            let re = term_regex(&name)?;
            self.terms.push(Term { name, re });
        }
        Ok(())
    }
}

/// Internal spaces match any run of space, `-`, `_` or `/`.
fn term_regex(term: &str) -> Result<Regex, regex::Error> {
    let pattern = regex::escape(term).replace(' ', r"[ \-_/]+");
    Regex::new(&format!("(?i){pattern}"))
}

fn is_word_byte(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Start offsets of matches not glued to a neighbouring letter or digit.
fn bounded_matches(re: &Regex, text: &str) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut at = 0;
    while at <= text.len() {
        let Some(m) = re.find_at(text, at) else {
            break;
        };
        let before_ok = !text[..m.start()].ends_with(is_word_byte);
        let after_ok = !text[m.end()..].starts_with(is_word_byte);
        if before_ok && after_ok && !m.is_empty() {
            hits.push(m.start());
            at = m.end();
        } else {
            // retry one character further on
            at = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
    }
    hits
}

/// Free-form fragments after lead-in phrases, with their offsets.
fn lead_in_fragments(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    for caps in LEAD_IN_RE.captures_iter(text) {
        let Some(frag) = caps.get(1) else { continue };
        let mut seg_start = 0;
        // a fragment ends with its sentence
        let body = match frag.as_str().find(". ") {
            Some(end) => &frag.as_str()[..end],
            None => frag.as_str(),
        };
        let mut cuts: Vec<(usize, usize)> = SPLIT_RE
            .find_iter(body)
            .map(|m| (m.start(), m.end()))
            .collect();
        cuts.push((body.len(), body.len()));
        for (cut_start, cut_end) in cuts {
            let part = &body[seg_start..cut_start];
            let offset = frag.start() + seg_start + (part.len() - part.trim_start().len());
            seg_start = cut_end;

            let cleaned = MULTI_SPACE_RE
                .replace_all(part.trim().trim_end_matches('.'), " ")
                .to_lowercase();
            let len = cleaned.chars().count();
            if (MIN_FRAGMENT..=MAX_FRAGMENT).contains(&len)
                && cleaned.chars().any(|c| c.is_ascii_alphanumeric())
            {
                out.push((offset, cleaned));
            }
        }
    }
    out
}

/// Vocabulary and free-form hits, ordered by first occurrence, unique, at most `limit`.
pub fn extract_skills(text: &str, vocab: &Vocabulary, limit: usize) -> Vec<String> {
    if text.is_empty() || limit == 0 {
        return Vec::new();
    }
    let mut hits: Vec<(usize, String)> = Vec::new();
    for term in &vocab.terms {
        hits.extend(
            bounded_matches(&term.re, text)
                .into_iter()
                .map(|pos| (pos, term.name.clone())),
        );
    }
    hits.extend(lead_in_fragments(text));

    // stable: ties keep vocabulary order
    hits.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for (_, skill) in hits {
        if ordered.len() >= limit {
            break;
        }
        if seen.insert(skill.clone()) {
            ordered.push(skill);
        }
    }
    ordered
}
