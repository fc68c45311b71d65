//! Renders token attributions as color-coded HTML.
//!
//! Every retained token becomes one inline-styled `<span>`: green for a positive
//! contribution, red for a negative one, with the magnitude as the alpha channel.
//! The rounded score is repeated in the `title` attribute so it shows on hover.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Sentence boundary markers emitted by the tokenizer. Never rendered.
pub const BOUNDARY_MARKERS: [&str; 2] = ["<s>", "</s>"];

const TRANSPARENT: &str = "rgba(255,255,255,0)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAttribution {
    pub token: String,
    pub score: f64,
}

impl TokenAttribution {
    pub fn new(token: impl Into<String>, score: f64) -> Self {
        Self {
            token: token.into(),
            score,
        }
    }
}

impl<S: Into<String>> From<(S, f64)> for TokenAttribution {
    fn from((token, score): (S, f64)) -> Self {
        Self::new(token, score)
    }
}

/// Renders one trait's attributions, in input order, as spans separated by a single space.
///
/// An empty input, or one holding only boundary markers, renders to the empty string.
pub fn attributions_to_html(attributions: &[TokenAttribution]) -> String {
    let mut html = String::new();
    for attribution in attributions
        .iter()
        .filter(|a| !BOUNDARY_MARKERS.contains(&a.token.as_str()))
    {
        if !html.is_empty() {
            html.push(' ');
        }
        let score = quantize(attribution.score);
        let _ = write!(
            html,
            r#"<span style="background-color: {}" title="{}">{}</span>"#,
            background(score),
            format_score(score),
            escape(&attribution.token)
        );
    }
    html
}

/// Rounds to two decimals, ties to even. Non-finite scores and negative zero become `0.0`.
pub fn quantize(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    let rounded = (score * 100.0).round_ties_even() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn background(score: f64) -> String {
    let alpha = format_score(score.abs().min(1.0));
    if score > 0.0 {
        format!("rgba(0,255,0,{})", alpha)
    } else if score < 0.0 {
        format!("rgba(255,0,0,{})", alpha)
    } else {
        TRANSPARENT.to_string()
    }
}

// Shortest round-trip form, always with a fractional part: 0.42, 0.0, -1.0.
fn format_score(score: f64) -> String {
    format!("{:?}", score)
}

/// Escapes text for use in HTML element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attributions(pairs: &[(&str, f64)]) -> Vec<TokenAttribution> {
        pairs.iter().map(|&(t, s)| TokenAttribution::new(t, s)).collect()
    }

    #[test]
    fn renders_sentence_without_boundary_markers() {
        let input = attributions(&[
            ("<s>", 0.0),
            ("I", 0.42),
            ("love", 0.87),
            ("cats", -0.33),
            ("</s>", 0.0),
        ]);
        let html = attributions_to_html(&input);
        assert_eq!(
            html,
            concat!(
                r#"<span style="background-color: rgba(0,255,0,0.42)" title="0.42">I</span> "#,
                r#"<span style="background-color: rgba(0,255,0,0.87)" title="0.87">love</span> "#,
                r#"<span style="background-color: rgba(255,0,0,0.33)" title="-0.33">cats</span>"#,
            )
        );
        assert!(!html.contains("&lt;s&gt;"));
        assert!(!html.contains("&lt;/s&gt;"));
    }

    #[test]
    fn tiny_score_rounds_to_transparent() {
        let html = attributions_to_html(&attributions(&[("ok", 0.001)]));
        assert_eq!(
            html,
            r#"<span style="background-color: rgba(255,255,255,0)" title="0.0">ok</span>"#
        );
    }

    #[test]
    fn small_negative_score_is_not_negative_zero() {
        let html = attributions_to_html(&attributions(&[("meh", -0.004)]));
        assert!(html.contains(r#"title="0.0""#));
        assert!(html.contains(TRANSPARENT));
    }

    #[test]
    fn empty_input_renders_empty_string() {
        assert_eq!(attributions_to_html(&[]), "");
        assert_eq!(
            attributions_to_html(&attributions(&[("<s>", 0.3), ("</s>", -0.2)])),
            ""
        );
    }

    #[test]
    fn full_negative_is_opaque_red() {
        let html = attributions_to_html(&attributions(&[("never", -1.0)]));
        assert_eq!(
            html,
            r#"<span style="background-color: rgba(255,0,0,1.0)" title="-1.0">never</span>"#
        );
    }

    #[test]
    fn token_text_is_escaped() {
        let html = attributions_to_html(&attributions(&[("<b>", 0.5), ("a&b", 0.0)]));
        assert!(html.contains(">&lt;b&gt;</span>"));
        assert!(html.contains(">a&amp;b</span>"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn only_exact_markers_are_dropped() {
        let html = attributions_to_html(&attributions(&[("<s>x", 0.1), (" <s>", 0.1)]));
        assert_eq!(html.matches("<span").count(), 2);
    }

    #[test]
    fn out_of_range_alpha_is_clamped() {
        let html = attributions_to_html(&attributions(&[("wow", 1.7), ("nan", f64::NAN)]));
        assert!(html.contains(r#"rgba(0,255,0,1.0)" title="1.7""#));
        assert!(html.contains(r#"rgba(255,255,255,0)" title="0.0">nan"#));
    }

    #[test]
    fn rendering_is_deterministic() {
        let input = attributions(&[("a", 0.123), ("b", -0.456), ("c", 0.0)]);
        assert_eq!(attributions_to_html(&input), attributions_to_html(&input));
    }

    #[test]
    fn quantize_rounds_to_two_decimals() {
        assert_eq!(quantize(0.424), 0.42);
        assert_eq!(quantize(-0.336), -0.34);
        assert_eq!(quantize(f64::INFINITY), 0.0);
        assert!(quantize(-0.001).is_sign_positive());
    }

    #[test]
    fn exact_halves_round_to_even() {
        assert_eq!(quantize(0.125), 0.12);
        assert_eq!(quantize(-0.625), -0.62);
        assert_eq!(quantize(0.375), 0.38);
        let html = attributions_to_html(&attributions(&[("x", 0.125), ("y", -0.625)]));
        assert_eq!(
            html,
            concat!(
                r#"<span style="background-color: rgba(0,255,0,0.12)" title="0.12">x</span> "#,
                r#"<span style="background-color: rgba(255,0,0,0.62)" title="-0.62">y</span>"#,
            )
        );
    }
}
