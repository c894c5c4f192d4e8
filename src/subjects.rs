//! Canonicalizes the free-text subject/grade strings that come back from the
//! coordinator profile source. Profile data is hand-typed ("English and Math
//! coordinator", "grade iv"), so everything here is best-effort: bad input
//! degrades to a cleaned string or drops out, never errors.

const FILLER_WORDS: [&str; 7] = [
    "coordinator",
    "coordinators",
    "subject",
    "subjects",
    "teacher",
    "teachers",
    "handled",
];

const SYNONYMS: [(&str, &str); 18] = [
    ("math", "Math"),
    ("maths", "Math"),
    ("mathematics", "Math"),
    ("english", "English"),
    ("eng", "English"),
    ("science", "Science"),
    ("sci", "Science"),
    ("filipino", "Filipino"),
    ("fil", "Filipino"),
    ("araling panlipunan", "Araling Panlipunan"),
    ("ap", "Araling Panlipunan"),
    ("mapeh", "MAPEH"),
    ("esp", "EsP"),
    ("edukasyon sa pagpapakatao", "EsP"),
    ("tle", "TLE"),
    ("epp", "EPP"),
    ("reading", "Reading"),
    ("values", "Values Education"),
];

/// Splits a raw profile string into an ordered, de-duplicated list of
/// canonical subject names. A single-element result is treated by callers as
/// a locked subject assignment.
pub fn normalize_subjects(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for segment in split_connectives(raw) {
        let Some(cleaned) = strip_filler(&segment) else {
            continue;
        };
        let canonical = lookup_synonym(&cleaned).unwrap_or_else(|| title_case(&cleaned));
        if !out.iter().any(|s| s.eq_ignore_ascii_case(&canonical)) {
            out.push(canonical);
        }
    }
    out
}

/// Extracts a grade number from digits, Roman numerals (i-x), or number
/// words, producing "Grade {n}". Unparsable non-empty input passes through
/// trimmed; empty or filler-only input yields None.
pub fn normalize_grade(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(n) = extract_grade_number(trimmed) {
        return Some(format!("Grade {}", n));
    }

    let lowered = trimmed.to_lowercase();
    let residue: String = lowered
        .split_whitespace()
        .filter(|w| *w != "grade" && *w != "level" && !FILLER_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ");
    if residue.is_empty() {
        return None;
    }

    Some(trimmed.to_string())
}

/// Maps a candidate subject onto the coordinator's allowed set. Exact
/// case-insensitive match wins, then normalized-form match, then substring
/// match in either direction, then the first allowed subject. None only when
/// the allowed set is empty.
pub fn sanitize_subject(candidate: Option<&str>, allowed: &[String]) -> Option<String> {
    if allowed.is_empty() {
        return None;
    }
    let candidate = candidate.map(str::trim).filter(|s| !s.is_empty());
    let Some(candidate) = candidate else {
        return Some(allowed[0].clone());
    };

    if let Some(hit) = allowed.iter().find(|a| a.eq_ignore_ascii_case(candidate)) {
        return Some(hit.clone());
    }

    let normalized = normalize_subjects(candidate);
    if let Some(first) = normalized.first() {
        if let Some(hit) = allowed.iter().find(|a| a.eq_ignore_ascii_case(first)) {
            return Some(hit.clone());
        }
    }

    let lowered = candidate.to_lowercase();
    if let Some(hit) = allowed.iter().find(|a| {
        let al = a.to_lowercase();
        al.contains(&lowered) || lowered.contains(&al)
    }) {
        return Some(hit.clone());
    }

    Some(allowed[0].clone())
}

fn split_connectives(raw: &str) -> Vec<String> {
    let mut normalized = raw.to_lowercase();
    for token in ["&", "/", "+", ";", ","] {
        normalized = normalized.replace(token, "|");
    }
    // " and " only as a standalone word; "mandarin" must survive.
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let mut joined = String::new();
    for w in words {
        if w == "and" {
            joined.push('|');
        } else {
            if !joined.is_empty() && !joined.ends_with('|') {
                joined.push(' ');
            }
            joined.push_str(w);
        }
    }
    joined
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drops filler words and "grade <n>" markers from one segment. Returns None
/// when nothing content-bearing remains.
fn strip_filler(segment: &str) -> Option<String> {
    let words: Vec<&str> = segment.split_whitespace().collect();
    let mut kept: Vec<&str> = Vec::new();
    let mut skip_next_number = false;
    for w in words {
        let bare: String = w.chars().filter(|c| c.is_alphanumeric()).collect();
        if bare.is_empty() {
            continue;
        }
        if skip_next_number && (parse_number_token(&bare).is_some()) {
            skip_next_number = false;
            continue;
        }
        skip_next_number = false;
        if bare == "grade" || bare == "level" {
            skip_next_number = true;
            continue;
        }
        if FILLER_WORDS.contains(&bare.as_str()) {
            continue;
        }
        kept.push(w);
    }
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}

fn lookup_synonym(cleaned: &str) -> Option<String> {
    let key = cleaned.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_grade_number(raw: &str) -> Option<u32> {
    let lowered = raw.to_lowercase();

    // Digits win, even when embedded ("grade3", "g-4").
    let mut digits = String::new();
    for c in lowered.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !digits.is_empty() {
            break;
        }
    }
    if let Ok(n) = digits.parse::<u32>() {
        if (1..=12).contains(&n) {
            return Some(n);
        }
    }

    for word in lowered.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() || word == "grade" || word == "level" {
            continue;
        }
        if let Some(n) = parse_number_token(word) {
            return Some(n);
        }
    }
    None
}

fn parse_number_token(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return if (1..=12).contains(&n) { Some(n) } else { None };
    }
    let roman = match token {
        "i" => 1,
        "ii" => 2,
        "iii" => 3,
        "iv" => 4,
        "v" => 5,
        "vi" => 6,
        "vii" => 7,
        "viii" => 8,
        "ix" => 9,
        "x" => 10,
        _ => 0,
    };
    if roman > 0 {
        return Some(roman);
    }
    let word = match token {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => 0,
    };
    if word > 0 {
        Some(word)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_conjunctions_and_strips_filler() {
        assert_eq!(
            normalize_subjects("English and Math coordinator"),
            vec!["English".to_string(), "Math".to_string()]
        );
        assert_eq!(
            normalize_subjects("Science / Filipino & MAPEH subjects handled"),
            vec!["Science".to_string(), "Filipino".to_string(), "MAPEH".to_string()]
        );
    }

    #[test]
    fn synonyms_collapse_to_canonical() {
        assert_eq!(normalize_subjects("mathematics"), vec!["Math".to_string()]);
        assert_eq!(normalize_subjects("maths; MATH"), vec!["Math".to_string()]);
        assert_eq!(
            normalize_subjects("araling panlipunan"),
            vec!["Araling Panlipunan".to_string()]
        );
    }

    #[test]
    fn unknown_subjects_are_title_cased() {
        assert_eq!(
            normalize_subjects("robotics club and HOME economics"),
            vec!["Robotics Club".to_string(), "Home Economics".to_string()]
        );
    }

    #[test]
    fn grade_markers_are_stripped_from_subjects() {
        assert_eq!(
            normalize_subjects("Grade 3 English teacher"),
            vec!["English".to_string()]
        );
    }

    #[test]
    fn empty_and_filler_only_input_yields_nothing() {
        assert!(normalize_subjects("").is_empty());
        assert!(normalize_subjects("subject coordinator").is_empty());
    }

    #[test]
    fn grade_from_digits_romans_and_words() {
        assert_eq!(normalize_grade("Grade 3"), Some("Grade 3".to_string()));
        assert_eq!(normalize_grade("grade iv"), Some("Grade 4".to_string()));
        assert_eq!(normalize_grade("GRADE SEVEN"), Some("Grade 7".to_string()));
        assert_eq!(normalize_grade("g-10 adviser"), Some("Grade 10".to_string()));
    }

    #[test]
    fn unparsable_grade_passes_through() {
        assert_eq!(
            normalize_grade("Kindergarten"),
            Some("Kindergarten".to_string())
        );
        assert_eq!(normalize_grade("   "), None);
        assert_eq!(normalize_grade("grade"), None);
    }

    #[test]
    fn sanitize_is_idempotent_on_canonical_members() {
        let allowed = vec!["English".to_string(), "Math".to_string()];
        for s in &allowed {
            assert_eq!(sanitize_subject(Some(s), &allowed), Some(s.clone()));
        }
    }

    #[test]
    fn sanitize_falls_back_in_order() {
        let allowed = vec!["English".to_string(), "Math".to_string()];
        // Normalized-form match.
        assert_eq!(
            sanitize_subject(Some("mathematics"), &allowed),
            Some("Math".to_string())
        );
        // Substring match.
        assert_eq!(
            sanitize_subject(Some("English Reading"), &allowed),
            Some("English".to_string())
        );
        // Unresolvable falls back to the first allowed subject.
        assert_eq!(
            sanitize_subject(Some("Chemistry"), &allowed),
            Some("English".to_string())
        );
        // Blank candidate takes the first allowed subject.
        assert_eq!(sanitize_subject(None, &allowed), Some("English".to_string()));
        // No allowed subjects at all.
        assert_eq!(sanitize_subject(Some("Math"), &[]), None);
    }
}
