//! Fuzzy matching predicates shared by traversal filters and the query
//! surface: context overlap, chapter substrings, accent folding and the
//! parenthesized search-term convention.

use deunicode::deunicode;

use crate::model::ArrowPtr;

/// Lowercase + accent-fold, the comparison form for all fuzzy matching.
pub fn fold(s: &str) -> String {
    deunicode(s).to_lowercase()
}

/// Fuzzy context-set match.
///
/// An empty user set matches anything, as does an empty stored set; the
/// token `any` (or an empty token) matches anything. Otherwise both sides
/// are folded and a stored item matches when it contains a user token
/// longer than three bytes.
pub fn match_context(stored: &[String], user: &[String]) -> bool {
    if user.is_empty() || stored.is_empty() {
        return true;
    }

    let folded: Vec<String> = stored.iter().map(|s| fold(s)).collect();

    for item in user {
        if item == "any" || item.is_empty() {
            return true;
        }
        let token = fold(&item.replace('|', ""));
        if token.len() > 3 && folded.iter().any(|s| s.contains(&token)) {
            return true;
        }
    }

    false
}

/// Arrow-set containment; an empty user set matches every arrow.
pub fn match_arrows(user: &[ArrowPtr], arr: ArrowPtr) -> bool {
    user.is_empty() || user.contains(&arr)
}

/// Chapter predicate: case-folded substring, with `any`/empty matching
/// everything and parenthesized terms additionally accent-folded.
pub fn match_chapter(node_chap: &str, chapter: &str) -> bool {
    if chapter.is_empty() || chapter == "any" {
        return true;
    }
    let (bracketed, term) = is_bracketed_term(chapter);
    if bracketed {
        fold(node_chap).contains(&fold(&term))
    } else {
        node_chap.to_lowercase().contains(&chapter.to_lowercase())
    }
}

/// Loose bidirectional string similarity used for chapter and arrow-name
/// probing. Empty and `any` match everything; a leading `!` on one side
/// only inverts containment.
pub fn similar_string(s1: &str, s2: &str) -> bool {
    if s1 == s2 {
        return true;
    }

    if s1.is_empty() || s2.is_empty() || s1 == "any" || s2 == "any" {
        return true;
    }

    let b1 = s1.starts_with('!');
    let b2 = s2.starts_with('!');
    if b1 != b2 && (!s2.contains(s1) || !s1.contains(s2)) {
        return true;
    }

    s2.contains(s1) || s1.contains(s2)
}

/// A search term written as `(term)` requests accent folding. Returns the
/// stripped term alongside the flag.
pub fn is_bracketed_term(src: &str) -> (bool, String) {
    let decomp = src.trim();
    if decomp.is_empty() {
        return (false, String::new());
    }
    if decomp.starts_with('(') && decomp.ends_with(')') {
        let stripped = decomp[1..decomp.len() - 1].trim().to_string();
        return (true, stripped);
    }
    (false, decomp.to_string())
}

/// List form of [`is_bracketed_term`]: stripped members are wrapped in `|`
/// markers so the context matcher can recognize them.
pub fn is_bracketed_list(list: &[String]) -> (bool, Vec<String>) {
    let mut any = false;
    let mut out = Vec::with_capacity(list.len());

    for item in list {
        let (bracketed, stripped) = is_bracketed_term(item);
        if bracketed {
            any = true;
            out.push(format!("|{stripped}|"));
        } else {
            out.push(item.clone());
        }
    }

    (any, out)
}

/// Name predicate for node-text searching: folded substring when the term
/// is parenthesized, lowercase substring otherwise.
pub fn match_name(text: &str, name: &str) -> bool {
    let (bracketed, term) = is_bracketed_term(name);
    if bracketed {
        fold(text).contains(&fold(&term))
    } else {
        text.to_lowercase().contains(&name.to_lowercase())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
