fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A recovered condition worth an operator's attention.
#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub action: &'a str,
    pub subject: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

pub fn render(event: WarnEvent<'_>) -> String {
    format!(
        "code={} stage={} action={} subject={} reason={} err={}",
        sanitize_value(event.code),
        sanitize_value(event.stage),
        sanitize_value(event.action),
        sanitize_value(event.subject),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    log::warn!("{}", render(event));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_value_rewrites_whitespace() {
        assert_eq!(sanitize_value("a b\tc"), "a_b_c");
    }

    #[test]
    fn sanitize_value_falls_back_for_empty() {
        assert_eq!(sanitize_value("   "), "na");
    }

    #[test]
    fn render_keeps_every_field_on_one_line() {
        let line = render(WarnEvent {
            code: "LOCAL_ARCHIVE_CORRUPT",
            stage: "archive",
            action: "load-quarter-file",
            subject: "/srv/history/2026-q1.json",
            reason: "parse failed",
            err: "expected value\nat line 1",
        });
        assert!(!line.contains('\n'));
        assert!(line.starts_with("code=LOCAL_ARCHIVE_CORRUPT stage=archive"));
        assert!(line.contains("reason=parse_failed"));
        assert!(line.contains("err=expected_value_at_line_1"));
    }
}
