// src/utils.rs
use once_cell::sync::Lazy;
use regex::Regex;

/// Words that mark a title as a job title rather than an organisation name.
pub const JOB_TITLE_KEYWORDS: &[&str] = &[
    "manager", "director", "engineer", "developer", "lead", "senior", "junior", "consultant",
    "analyst", "specialist", "coordinator", "associate", "assistant", "intern", "head", "chief",
    "officer", "president", "vp", "architect", "designer", "administrator", "supervisor",
    "founder", "owner", "partner", "principal", "scientist", "researcher", "advisor", "adviser",
    "representative", "executive", "accountant", "technician", "teacher", "professor", "lecturer",
    "recruiter", "programmer", "ceo", "cto", "cfo", "coo", "cio", "staff", "trainee", "writer",
    "editor", "strategist", "product", "programme", "program", "project", "sales", "marketing",
    "operations", "controller", "auditor", "attorney", "lawyer", "counsel", "nurse", "physician",
    "agent", "member", "volunteer", "fellow", "contractor", "freelancer", "tester",
    "qa", "devops", "sre", "board", "secretary", "treasurer", "instructor", "tutor",
];

static EMBEDDED_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bat\s+)?\b\d{1,2}\s*(?:yrs?|years?|mos?|months?)\b")
        .expect("embedded duration pattern is valid")
});

static EMPLOYMENT_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:full[- ]?time|part[- ]?time|contract|freelance|internship|self[- ]employed|seasonal|apprenticeship|temporary)\b",
    )
    .expect("employment type pattern is valid")
});

/// Collapse runs of whitespace and trim
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased alphanumeric tokens of a title
fn title_tokens(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

pub fn has_job_title_keyword(title: &str) -> bool {
    title_tokens(title).any(|token| JOB_TITLE_KEYWORDS.contains(&token.as_str()))
}

/// True when the company text carries a duration fragment such as "· 14 yrs" or "at 3 yrs".
pub fn has_embedded_duration(company: &str) -> bool {
    EMBEDDED_DURATION.is_match(company)
}

/// The duration fragment embedded in a company field, from its first token onwards.
pub fn embedded_duration_fragment(company: &str) -> Option<&str> {
    EMBEDDED_DURATION.find(company).map(|m| company[m.start()..].trim())
}

/// A capitalised title with no job-title vocabulary and no digits, e.g. "Acme Corp".
pub fn looks_like_org_name(title: &str) -> bool {
    let title = title.trim();
    let starts_capitalised = title
        .chars()
        .find(|c| c.is_alphabetic())
        .is_some_and(|c| c.is_uppercase());

    starts_capitalised
        && !title.chars().any(|c| c.is_ascii_digit())
        && !has_job_title_keyword(title)
}

/// Employer grouping key: separator suffixes, employment types and duration
/// fragments removed, lowercased.
pub fn normalize_employer(company: &str) -> String {
    let head = company
        .split(['·', '•', '|'])
        .next()
        .unwrap_or_default();

    let head = match EMBEDDED_DURATION.find(head) {
        Some(m) => &head[..m.start()],
        None => head,
    };

    let stripped = EMPLOYMENT_TYPE.replace_all(head, " ");

    clean_text(&stripped)
        .trim_matches(|c: char| c == ',' || c == '-' || c == '.' || c.is_whitespace())
        .to_lowercase()
}

/// Stable profile key from a profile URL such as
/// `https://www.linkedin.com/in/jane-doe-42/details/experience/`.
///
/// Input without an `/in/` segment is taken to be an id already.
pub fn profile_id_from_url(source: &str) -> String {
    let source = source.trim();

    let id = match source.find("/in/") {
        Some(pos) => source[pos + 4..]
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default(),
        None => source.trim_end_matches('/'),
    };

    id.to_lowercase()
}
