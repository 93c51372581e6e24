pub const ANALYZE_TEXT: &str = include_str!("../data/prompts/analyze_text.txt");
pub const ANALYZE_IMAGE: &str = include_str!("../data/prompts/analyze_image.txt");
pub const VIDEO_SCRIPT: &str = include_str!("../data/prompts/video_script.txt");
pub const SOCIAL_POST: &str = include_str!("../data/prompts/social_post.txt");
pub const PROBE: &str = include_str!("../data/prompts/probe.txt");

/// Replace `{{key}}` placeholders in a template string.
///
/// Single pass over the template: substituted values are never rescanned, so
/// model text containing `{{...}}` comes through verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after[..end];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => result.push_str(value),
            None => {
                result.push_str("{{");
                result.push_str(key);
                result.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{{a}} and {{b}}", &[("a", "cats")]), "cats and {{b}}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let rendered = render(
            "{{summary}} | {{keywords}} | {{contact}}",
            &[
                ("summary", "Loft {{keywords}} {{contact}}"),
                ("keywords", "loft"),
                ("contact", "@agent"),
            ],
        );
        assert_eq!(rendered, "Loft {{keywords}} {{contact}} | loft | @agent");
    }

    #[test]
    fn test_render_unclosed_placeholder_is_literal() {
        assert_eq!(render("a {{b", &[("b", "x")]), "a {{b");
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!ANALYZE_TEXT.is_empty());
        assert!(!ANALYZE_IMAGE.is_empty());
        assert!(!VIDEO_SCRIPT.is_empty());
        assert!(!SOCIAL_POST.is_empty());
        assert!(!PROBE.is_empty());
    }

    #[test]
    fn test_templates_have_placeholders() {
        assert!(ANALYZE_TEXT.contains("{{input}}"));
        assert!(VIDEO_SCRIPT.contains("{{summary}}"));
        assert!(VIDEO_SCRIPT.contains("{{keywords}}"));
        assert!(SOCIAL_POST.contains("{{contact}}"));
    }
}
