/// Sanitize extracted text before passing downstream.
/// Strips control characters, trims line ends and collapses runs of blank
/// lines to a single paragraph break. Hangul, bullets and symbols are kept.
pub fn sanitize_extracted_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .map(|c| if c == '\t' || c == '\u{a0}' { ' ' } else { c })
        .filter(|c| *c == '\n' || !c.is_control())
        .filter(|c| !matches!(c, '\u{feff}' | '\u{200b}'))
        .collect();

    let mut out: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for line in filtered.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push("");
            }
        } else {
            blank_run = 0;
            out.push(line);
        }
    }

    while out.last() == Some(&"") {
        out.pop();
    }

    out.join("\n")
}
