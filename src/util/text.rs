use std::borrow::Cow;

/// Ellipsis appended when text is cut
const ELLIPSIS: &str = "...";

/// Named entities decoded after tag stripping. XML-level escapes are already
/// resolved by the feed reader, so these are the ones left behind by HTML
/// embedded inside descriptions.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&rdquo;", "\""),
    ("&ldquo;", "\""),
    ("&hellip;", "..."),
    ("&mdash;", "-"),
    ("&ndash;", "-"),
];

/// Removes HTML markup from feed-supplied text.
///
/// Tags are dropped, `<script>`/`<style>` bodies are dropped with them,
/// common named and numeric entities are decoded, and runs of whitespace
/// collapse to a single space.
///
/// # Examples
///
/// ```
/// use headline::util::strip_html;
///
/// assert_eq!(strip_html("<p>Claude <b>4</b> is out</p>"), "Claude 4 is out");
/// assert_eq!(strip_html("Tom &amp; Jerry"), "Tom & Jerry");
/// ```
pub fn strip_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();
    let lower = s.to_ascii_lowercase();

    while let Some((idx, c)) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }

        // Skip raw-text elements entirely, content included
        let skip_until = ["script", "style"].iter().find_map(|tag| {
            let open = format!("<{tag}");
            if lower[idx..].starts_with(&open) {
                let close = format!("</{tag}>");
                Some(
                    lower[idx..]
                        .find(&close)
                        .map(|pos| idx + pos + close.len())
                        .unwrap_or(s.len()),
                )
            } else {
                None
            }
        });

        let end = match skip_until {
            Some(end) => end,
            None => match s[idx..].find('>') {
                Some(pos) => idx + pos + 1,
                // Stray '<' with no closing bracket is text, not markup
                None => {
                    out.push(c);
                    continue;
                }
            },
        };

        // Tags separate words ("<p>a</p><p>b</p>" reads as "a b")
        out.push(' ');
        while let Some(&(next, _)) = chars.peek() {
            if next >= end {
                break;
            }
            chars.next();
        }
    }

    collapse_whitespace(&decode_entities(&out)).into_owned()
}

/// Decodes the handful of HTML entities that commonly survive in feed text.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some((entity, replacement)) = ENTITIES.iter().find(|(e, _)| rest.starts_with(e)) {
            out.push_str(replacement);
            rest = &rest[entity.len()..];
            continue;
        }

        if let Some(decoded) = decode_numeric_entity(rest) {
            out.push(decoded.0);
            rest = &rest[decoded.1..];
            continue;
        }

        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Decodes `&#NNN;` / `&#xHH;` at the start of `s`, returning the char and
/// the number of bytes consumed.
fn decode_numeric_entity(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let end = body.find(';')?;
    if end == 0 || end > 8 {
        return None;
    }
    let digits = &body[..end];
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    Some((char::from_u32(code)?, 2 + end + 1))
}

/// Collapses every run of whitespace to one space and trims both ends.
///
/// Returns `Cow::Borrowed` when the input is already collapsed.
pub fn collapse_whitespace(s: &str) -> Cow<'_, str> {
    let trimmed = s.trim();
    let already_clean = !trimmed
        .as_bytes()
        .windows(2)
        .any(|w| w[0].is_ascii_whitespace() && w[1].is_ascii_whitespace())
        && !trimmed
            .chars()
            .any(|c| c.is_whitespace() && c != ' ');

    if already_clean {
        return Cow::Borrowed(trimmed);
    }

    Cow::Owned(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Truncates to at most `max_chars` characters, appending "..." when text
/// is cut. The ellipsis counts toward the limit.
///
/// # Examples
///
/// ```
/// use headline::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 8), "Hello...");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_chars {
        return Cow::Borrowed(s);
    }
    if max_chars <= ELLIPSIS.len() {
        return Cow::Owned(s.chars().take(max_chars).collect());
    }

    let keep = max_chars - ELLIPSIS.len();
    let cut: String = s.chars().take(keep).collect();
    Cow::Owned(format!("{}{}", cut.trim_end(), ELLIPSIS))
}

/// Canonical form of a headline used for ids and duplicate detection:
/// lowercase, punctuation removed, whitespace collapsed.
///
/// # Examples
///
/// ```
/// use headline::util::normalize_title;
///
/// assert_eq!(
///     normalize_title("  Claude 4 Released by Anthropic! "),
///     "claude 4 released by anthropic"
/// );
/// ```
pub fn normalize_title(s: &str) -> String {
    let stripped: String = s
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && !is_unicode_punctuation(*c))
        .flat_map(char::to_lowercase)
        .collect();
    collapse_whitespace(&stripped).into_owned()
}

fn is_unicode_punctuation(c: char) -> bool {
    matches!(
        c,
        '\u{2018}'..='\u{201F}' | '\u{2010}'..='\u{2015}' | '\u{2026}' | '\u{00AB}' | '\u{00BB}'
    )
}
