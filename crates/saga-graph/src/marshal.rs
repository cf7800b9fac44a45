//! Text marshalling of composite values for the tabular wire format:
//! node pointers as `(class,index)`, links as
//! `(arr, wgt, { "ctx", … }, (class,index))`, link arrays joined by
//! newline, page-map paths joined by `","`, and paths as `;`-separated
//! links with one path per line.
//!
//! Parsing is tolerant: doubled quotes and backslash escapes are
//! unescaped, array elements are split with a quote-awareness flag, and
//! malformed elements are skipped rather than failing a whole batch.

use crate::model::{ArrowPtr, Link, NodePtr};

// ─────────────────────────────────────────────
// Formatting
// ─────────────────────────────────────────────

pub fn format_node_ptr(nptr: NodePtr) -> String {
    format!("({},{})", nptr.class, nptr.cptr)
}

/// Curly-braced, quoted, ASCII-sorted string array. Sorting avoids
/// ambiguity when stored values are compared as text.
pub fn format_string_array(array: &[String]) -> String {
    if array.is_empty() {
        return "{ }".to_string();
    }
    let mut sorted: Vec<&String> = array.iter().collect();
    sorted.sort();

    let items: Vec<String> = sorted
        .iter()
        .map(|s| format!("\"{}\"", s.replace('"', "\"\"")))
        .collect();
    format!("{{ {} }}", items.join(", "))
}

pub fn format_node_ptr_array(array: &[NodePtr]) -> String {
    if array.is_empty() {
        return "{ }".to_string();
    }
    let items: Vec<String> = array
        .iter()
        .map(|n| format!("\"{}\"", format_node_ptr(*n)))
        .collect();
    format!("{{ {} }}", items.join(", "))
}

pub fn format_link(link: &Link) -> String {
    format!(
        "({}, {:.6}, {}, {})",
        link.arr.0,
        link.wgt,
        format_string_array(&link.ctx),
        format_node_ptr(link.dst)
    )
}

/// Newline-separated link array (adjacency column rendering).
pub fn format_link_array(links: &[Link]) -> String {
    links
        .iter()
        .map(format_link)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Page-map path rendering: each link quoted, elements `","`-separated.
pub fn format_map_link_array(links: &[Link]) -> String {
    links
        .iter()
        .map(|l| format!("\"{}\"", format_link(l)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Path-set rendering: links joined by `;`, one path per line.
pub fn format_link_path(paths: &[Vec<Link>]) -> String {
    paths
        .iter()
        .map(|p| p.iter().map(format_link).collect::<Vec<_>>().join(";"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-facing context rendering, `", "`-joined without decoration.
pub fn context_string(context: &[String]) -> String {
    context.join(", ")
}

// ─────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────

/// Split on a separator outside double quotes, unescaping doubled quotes
/// and backslash escapes. The quotes themselves are consumed.
fn split_quoted(s: &str, sep: char) -> Vec<String> {
    let mut items = Vec::new();
    let mut item = String::new();
    let mut protected = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    item.push(next);
                }
            }
            '"' => {
                if protected && chars.peek() == Some(&'"') {
                    chars.next();
                    item.push('"');
                } else {
                    protected = !protected;
                }
            }
            c if c == sep && !protected => {
                items.push(item.clone());
                item.clear();
            }
            c => item.push(c),
        }
    }
    items.push(item);
    items
}

/// Split on top-level commas only: quotes are preserved for nested
/// parsing, and parenthesized or braced sub-values stay whole.
fn split_top_level(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut item = String::new();
    let mut depth = 0i32;
    let mut protected = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if protected && chars.peek() == Some(&'"') {
                    chars.next();
                    item.push_str("\"\"");
                } else {
                    protected = !protected;
                    item.push('"');
                }
            }
            '(' | '{' if !protected => {
                depth += 1;
                item.push(c);
            }
            ')' | '}' if !protected => {
                depth -= 1;
                item.push(c);
            }
            ',' if !protected && depth == 0 => {
                items.push(item.trim().to_string());
                item.clear();
            }
            c => item.push(c),
        }
    }
    items.push(item.trim().to_string());
    items
}

fn unquote(s: &str) -> &str {
    let t = s.trim();
    t.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(t)
}

/// Parse `(class,index)`, tolerating surrounding quotes.
pub fn parse_node_ptr(s: &str) -> Option<NodePtr> {
    let t = unquote(s);
    let t = t.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = t.splitn(2, ',');
    let class = parts.next()?.trim().parse::<i32>().ok()?;
    let cptr = parts.next()?.trim().parse::<i64>().ok()?;
    Some(NodePtr { class, cptr })
}

/// Parse a curly-braced string array with the quote-awareness flag.
pub fn parse_string_array(s: &str) -> Vec<String> {
    let t = unquote(s).trim();
    let t = t
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(t);

    split_quoted(t, ',')
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn parse_node_ptr_array(s: &str) -> Vec<NodePtr> {
    parse_string_array(s)
        .iter()
        .filter_map(|item| parse_node_ptr(item))
        .collect()
}

/// Parse one link literal `(arr, wgt, { … }, (class,index))`.
pub fn parse_link(s: &str) -> Option<Link> {
    let t = unquote(s).trim();
    let t = t.strip_prefix('(')?.strip_suffix(')')?;

    let fields = split_top_level(t);
    if fields.len() < 4 {
        return None;
    }

    let arr = fields[0].parse::<i32>().ok()?;
    let wgt = fields[1].parse::<f64>().ok()?;
    let ctx = parse_string_array(&fields[2]);
    let dst = parse_node_ptr(&fields[3])?;

    Some(Link {
        arr: ArrowPtr(arr),
        wgt,
        ctx,
        dst,
    })
}

/// Newline-separated link array.
pub fn parse_link_array(s: &str) -> Vec<Link> {
    let t = s.trim();
    if t.len() <= 2 {
        return Vec::new();
    }
    t.lines().filter_map(parse_link).collect()
}

/// Page-map path: quoted links split on `","`.
pub fn parse_map_link_array(s: &str) -> Vec<Link> {
    let t = s.trim();
    if t.len() <= 2 {
        return Vec::new();
    }
    let t = t.strip_prefix('"').unwrap_or(t);
    let t = t.strip_suffix('"').unwrap_or(t);
    t.split("\",\"").filter_map(parse_link).collect()
}

/// Path set: one path per line, links split on `;`. Trivial single-link
/// lines are dropped.
pub fn parse_link_path(s: &str) -> Vec<Vec<Link>> {
    let mut paths = Vec::new();

    for line in s.trim().lines() {
        if line.is_empty() {
            continue;
        }
        let links: Vec<&str> = line.split(';').collect();
        if links.len() < 2 {
            continue;
        }
        let parsed: Vec<Link> = links.iter().filter_map(|l| parse_link(l)).collect();
        if parsed.len() >= 2 {
            paths.push(parsed);
        }
    }

    paths
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn link(arr: i32, ctx: &[&str], dst: (i32, i64)) -> Link {
        Link {
            arr: ArrowPtr(arr),
            wgt: 0.34,
            ctx: ctx.iter().map(|s| s.to_string()).collect(),
            dst: NodePtr::new(dst.0, dst.1),
        }
    }

    #[test]
    fn node_ptr_round_trip() {
        let n = NodePtr::new(4, 17);
        assert_eq!(parse_node_ptr(&format_node_ptr(n)), Some(n));
        assert_eq!(parse_node_ptr("\"(4,17)\""), Some(n));
        assert_eq!(parse_node_ptr("garbage"), None);
    }

    #[test]
    fn string_array_round_trip_sorts() {
        let ctx = vec!["fairy castles".to_string(), "angel air".to_string()];
        let text = format_string_array(&ctx);
        assert_eq!(text, "{ \"angel air\", \"fairy castles\" }");
        assert_eq!(
            parse_string_array(&text),
            vec!["angel air".to_string(), "fairy castles".to_string()]
        );
    }

    #[test]
    fn empty_string_array_round_trip() {
        assert_eq!(format_string_array(&[]), "{ }");
        assert!(parse_string_array("{ }").is_empty());
        assert!(parse_string_array("{}").is_empty());
    }

    #[test]
    fn string_array_tolerates_doubled_quotes() {
        // nested-composite renderings double their quotes
        let parsed = parse_string_array("{ \"\"fairy castles\"\", \"angel air\" }");
        assert_eq!(parsed, vec!["fairy castles", "angel air"]);

        // a doubled quote inside a quoted item is an escaped quote
        let escaped = parse_string_array("{ \"he said \"\"hi\"\"\" }");
        assert_eq!(escaped, vec!["he said \"hi\""]);
    }

    #[test]
    fn link_round_trip() {
        let l = link(77, &["fairy castles", "angel air"], (4, 2));
        let text = format_link(&l);
        let back = parse_link(&text).unwrap();
        assert_eq!(back.arr, l.arr);
        assert!((back.wgt - l.wgt).abs() < 1e-9);
        assert_eq!(back.dst, l.dst);
        let mut expect = l.ctx.clone();
        expect.sort();
        assert_eq!(back.ctx, expect);
    }

    #[test]
    fn link_round_trip_empty_context() {
        let l = link(0, &[], (0, 0));
        let back = parse_link(&format_link(&l)).unwrap();
        assert!(back.ctx.is_empty());
        assert_eq!(back.dst, NodePtr::new(0, 0));
    }

    #[test]
    fn link_parses_store_rendering() {
        let l =
            parse_link("(77,0.34,\"{ \"\"fairy castles\"\", \"\"angel air\"\" }\",\"(4,2)\")")
                .unwrap();
        assert_eq!(l.arr, ArrowPtr(77));
        assert_eq!(l.ctx, vec!["fairy castles", "angel air"]);
        assert_eq!(l.dst, NodePtr::new(4, 2));
    }

    #[test]
    fn link_array_round_trip() {
        let links = vec![link(1, &["a"], (1, 0)), link(2, &[], (4, 9))];
        let text = format_link_array(&links);
        let back = parse_link_array(&text);
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].dst, links[0].dst);
        assert_eq!(back[1].arr, links[1].arr);
    }

    #[test]
    fn map_link_array_round_trip() {
        let links = vec![link(1, &["a", "b"], (1, 0)), link(2, &[], (4, 9))];
        let text = format_map_link_array(&links);
        let back = parse_map_link_array(&text);
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].dst, links[1].dst);
    }

    #[test]
    fn link_path_round_trip_drops_trivial_lines() {
        let paths = vec![
            vec![link(0, &[], (1, 0)), link(5, &["x"], (1, 1))],
            vec![link(0, &[], (1, 0))], // trivial, dropped on parse
        ];
        let text = format_link_path(&paths);
        let back = parse_link_path(&text);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].len(), 2);
        assert_eq!(back[0][1].dst, NodePtr::new(1, 1));
    }

    #[test]
    fn node_ptr_array_round_trip() {
        let ptrs = vec![NodePtr::new(2, 4), NodePtr::new(3, 4)];
        let back = parse_node_ptr_array(&format_node_ptr_array(&ptrs));
        assert_eq!(back, ptrs);
    }

    #[test]
    fn context_string_joins_plainly() {
        let ctx = vec!["a".to_string(), "b".to_string()];
        assert_eq!(context_string(&ctx), "a, b");
    }
}
