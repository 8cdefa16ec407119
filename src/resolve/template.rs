/// A piece of a display or code template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// `{n}`; `raw` is the placeholder text including braces.
    Placeholder { index: usize, raw: &'a str },
}

/// Splits `template` into literal runs and `{n}` placeholders, left to right.
/// Braces that do not enclose a decimal index stay literal.
pub fn segments(template: &str) -> Vec<Segment<'_>> {
    let bytes = template.as_bytes();
    let mut output = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while cursor < bytes.len() {
        if bytes[cursor] != b'{' {
            cursor += 1;
            continue;
        }

        let digits_start = cursor + 1;
        let mut digits_end = digits_start;
        while digits_end < bytes.len() && bytes[digits_end].is_ascii_digit() {
            digits_end += 1;
        }

        let closed = digits_end > digits_start && bytes.get(digits_end) == Some(&b'}');
        let index = if closed {
            template[digits_start..digits_end].parse::<usize>().ok()
        } else {
            None
        };

        match index {
            Some(index) => {
                if literal_start < cursor {
                    output.push(Segment::Literal(&template[literal_start..cursor]));
                }
                output.push(Segment::Placeholder {
                    index,
                    raw: &template[cursor..=digits_end],
                });
                cursor = digits_end + 1;
                literal_start = cursor;
            }
            None => cursor += 1,
        }
    }

    if literal_start < bytes.len() {
        output.push(Segment::Literal(&template[literal_start..]));
    }
    output
}

pub fn has_placeholders(template: &str) -> bool {
    segments(template)
        .iter()
        .any(|segment| matches!(segment, Segment::Placeholder { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_literals_and_placeholders_in_order() {
        assert_eq!(
            segments("Set {0} to {12}!"),
            vec![
                Segment::Literal("Set "),
                Segment::Placeholder { index: 0, raw: "{0}" },
                Segment::Literal(" to "),
                Segment::Placeholder { index: 12, raw: "{12}" },
                Segment::Literal("!"),
            ]
        );
    }

    #[test]
    fn non_numeric_braces_stay_literal() {
        assert_eq!(
            segments("if (x) { {a} {} {1"),
            vec![Segment::Literal("if (x) { {a} {} {1")]
        );
        assert!(!has_placeholders("for (;;) {}"));
    }

    #[test]
    fn adjacent_placeholders_and_multibyte_text() {
        assert_eq!(
            segments("{0}{1} 灵石"),
            vec![
                Segment::Placeholder { index: 0, raw: "{0}" },
                Segment::Placeholder { index: 1, raw: "{1}" },
                Segment::Literal(" 灵石"),
            ]
        );
    }

    #[test]
    fn overflowing_index_is_literal() {
        let huge = "{99999999999999999999999}";
        assert_eq!(segments(huge), vec![Segment::Literal(huge)]);
    }

    #[test]
    fn empty_template_has_no_segments() {
        assert!(segments("").is_empty());
    }
}
