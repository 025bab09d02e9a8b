use regex::Regex;

/// Every anchor-tag `href` in the HTML, in document order, duplicates
/// preserved. No URL normalization and no `mailto:` filtering; the captured
/// value is returned verbatim.
pub fn extract_links(html: &str) -> Vec<String> {
    let anchor_pattern = Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*"([^"]*)""#)
        .expect("compile anchor href regex");

    anchor_pattern
        .captures_iter(html)
        .map(|capture| capture[1].to_string())
        .collect()
}
