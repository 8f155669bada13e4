// ── Identifier sanitization ──
//
// Appliance ids and capability keys end up in bus topics and hub unique
// ids. Both sanitizers are total: any input yields a non-empty token in
// the allowed alphabet that never starts with a digit or separator and
// never contains a doubled separator.

const UNKNOWN: &str = "unknown";

/// Token safe for a single topic level: ASCII alphanumerics, `_`, `-`.
///
/// `+` and `#` (topic wildcards) become `plus` / `hash`; any other
/// character becomes `_`.
pub fn topic_token(raw: &str) -> String {
    let mut expanded = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '+' => expanded.push_str("_plus_"),
            '#' => expanded.push_str("_hash_"),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => expanded.push(c),
            _ => expanded.push('_'),
        }
    }
    finish(&expanded, &['_', '-'])
}

/// Token safe for a hub unique id: ASCII alphanumerics, `.`, `_`, `-`.
pub fn unique_id_token(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    finish(&mapped, &['.', '_', '-'])
}

/// Collapse separator runs, trim separators at both ends, guard against
/// a leading digit, and map empty output to `unknown`.
fn finish(mapped: &str, separators: &[char]) -> String {
    let mut out = String::with_capacity(mapped.len());
    let mut in_run = false;
    for c in mapped.chars() {
        if separators.contains(&c) {
            if !in_run && !out.is_empty() {
                out.push(c);
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }

    while out.ends_with(|c: char| separators.contains(&c)) {
        out.pop();
    }

    if out.is_empty() {
        return UNKNOWN.to_owned();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(token: &str, separators: &[char]) {
        assert!(!token.is_empty());
        let first = token.chars().next().unwrap_or('x');
        assert!(!first.is_ascii_digit() || token.is_empty(), "{token}");
        assert!(first == '_' || !separators.contains(&first), "{token}");
        let chars: Vec<char> = token.chars().collect();
        for pair in chars.windows(2) {
            assert!(
                !(separators.contains(&pair[0]) && separators.contains(&pair[1])),
                "doubled separator in {token}"
            );
        }
    }

    #[test]
    fn topic_token_replaces_wildcards_and_spaces() {
        let token = topic_token("kitchen fridge #1");
        assert_eq!(token, "kitchen_fridge_hash_1");
        assert!(!token.contains('#'));
        assert!(!token.contains(' '));

        assert_eq!(topic_token("a+b"), "a_plus_b");
        assert_eq!(topic_token("910280213_00:12345678-443E"), "_910280213_00_12345678-443E");
    }

    #[test]
    fn topic_token_collapses_and_trims() {
        assert_eq!(topic_token("  --a//b__c--  "), "a_b_c");
        assert_eq!(topic_token("a-_b"), "a-b");
        assert_eq!(topic_token(""), "unknown");
        assert_eq!(topic_token("///"), "unknown");
        assert_eq!(topic_token("Küche"), "K_che");
    }

    #[test]
    fn unique_id_token_keeps_dots() {
        assert_eq!(unique_id_token("hearth.fridge temp"), "hearth.fridge_temp");
        assert_eq!(unique_id_token("..x..y.."), "x.y");
        assert_eq!(unique_id_token("7up"), "_7up");
        assert_eq!(unique_id_token("#"), "unknown");
    }

    #[test]
    fn sanitizers_are_total() {
        let inputs = [
            "", " ", "#", "+", "9", "-9", "a b c", "__x__", "ünïcødé", "a/b/c", "1.2.3", "x--y..z",
            "\t\n", "🔥 oven",
        ];
        for input in inputs {
            let t = topic_token(input);
            assert!(
                t.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
                "{t}"
            );
            assert_well_formed(&t, &['_', '-']);

            let u = unique_id_token(input);
            assert!(
                u.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')),
                "{u}"
            );
            assert_well_formed(&u, &['.', '_', '-']);
        }
    }
}
