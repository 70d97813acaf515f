//! Period tags embedded in free-text labels.
//!
//! A label such as `FACT CIE BT 05/2024 ABIDJAN` carries at most one tag,
//! right after the anchor. Re-annotating replaces the tag instead of
//! appending a second one.

use regex::{NoExpand, Regex};

use crate::error::{ReconError, Result};

/// Compiled rewrite for one anchor, tag shape and target tag.
#[derive(Debug, Clone)]
pub struct LabelRule {
    anchor: String,
    tag: String,
    strip: Regex,
}

impl LabelRule {
    /// `shape` is a regex for tags already present (`\d{2}/\d{4}`); `tag` is
    /// the value to insert. A tag outside the shape is still recognized on
    /// later runs, so the rewrite stays idempotent.
    pub fn new(anchor: &str, shape: &str, tag: &str) -> Result<Self> {
        Self::with_known_tags(anchor, shape, tag, std::iter::empty::<&str>())
    }

    /// Like [`LabelRule::new`], also stripping each of `known`. Earlier
    /// periods that do not fit `shape` (`P1`, `T2`) are replaced rather than
    /// stacked when they are listed here.
    pub fn with_known_tags<I, S>(anchor: &str, shape: &str, tag: &str, known: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tag = tag.trim();
        let mut literals: Vec<String> = known
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .chain(std::iter::once(tag.to_string()))
            .filter(|k| !k.is_empty())
            .collect();
        // Longest first so `P10` is not read as `P1` followed by `0`
        literals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        literals.dedup();

        let mut alternatives = format!("(?:{shape})");
        for literal in &literals {
            alternatives.push('|');
            alternatives.push_str(&regex::escape(literal));
            if literal.ends_with(|c: char| c.is_alphanumeric()) {
                alternatives.push_str(r"\b");
            }
        }
        let pattern = format!(r"{}(?:\s+(?:{alternatives}))+", regex::escape(anchor));
        let strip = Regex::new(&pattern).map_err(|source| ReconError::InvalidTagShape {
            pattern: shape.to_string(),
            source,
        })?;
        Ok(Self {
            anchor: anchor.to_string(),
            tag: tag.to_string(),
            strip,
        })
    }

    /// Rewrite `label`. Labels without the anchor are returned unchanged.
    pub fn apply(&self, label: &str) -> String {
        if self.anchor.is_empty() || !label.contains(&self.anchor) {
            return label.to_string();
        }
        let stripped = self.strip.replace_all(label, NoExpand(&self.anchor));
        if self.tag.is_empty() {
            return stripped.into_owned();
        }
        let stamped = format!("{} {}", self.anchor, self.tag);
        stripped.replacen(&self.anchor, &stamped, 1)
    }
}

/// One-shot form of [`LabelRule::apply`].
pub fn annotate(label: &str, anchor: &str, tag: &str, shape: &str) -> Result<String> {
    Ok(LabelRule::new(anchor, shape, tag)?.apply(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BT: &str = r"\d{2}/\d{4}";
    const HT: &str = r"\d{2}-\d{4}";

    #[test]
    fn replaces_existing_tag() {
        let out = annotate("FACT CIE BT 05/2024 ABJ", "CIE BT", "06/2024", BT).unwrap();
        assert_eq!(out, "FACT CIE BT 06/2024 ABJ");
    }

    #[test]
    fn inserts_when_untagged() {
        let out = annotate("FACT CIE HT ABJ", "CIE HT", "06-2024", HT).unwrap();
        assert_eq!(out, "FACT CIE HT 06-2024 ABJ");
    }

    #[test]
    fn collapses_stacked_tags() {
        let out = annotate("CIE BT 04/2024 05/2024 ABJ", "CIE BT", "06/2024", BT).unwrap();
        assert_eq!(out, "CIE BT 06/2024 ABJ");
        let out = annotate("CIE BT 04/2024 X CIE BT 05/2024", "CIE BT", "06/2024", BT).unwrap();
        assert_eq!(out, "CIE BT 06/2024 X CIE BT");
    }

    #[test]
    fn no_anchor_no_change() {
        let out = annotate("ELECTRICITE 05/2024", "CIE BT", "06/2024", BT).unwrap();
        assert_eq!(out, "ELECTRICITE 05/2024");
    }

    #[test]
    fn empty_tag_strips() {
        let out = annotate("CIE BT 05/2024 ABJ", "CIE BT", "", BT).unwrap();
        assert_eq!(out, "CIE BT ABJ");
    }

    #[test]
    fn off_shape_tag_is_idempotent() {
        let rule = LabelRule::new("CIE BT", BT, "202406").unwrap();
        let once = rule.apply("CIE BT ABJ");
        assert_eq!(once, "CIE BT 202406 ABJ");
        assert_eq!(rule.apply(&once), once);
    }

    #[test]
    fn known_off_shape_tags_are_replaced() {
        let first = LabelRule::with_known_tags("CIE BT", BT, "P1", ["P0"]).unwrap();
        let once = first.apply("FACT CIE BT ABJ");
        assert_eq!(once, "FACT CIE BT P1 ABJ");

        let second = LabelRule::with_known_tags("CIE BT", BT, "P2", ["P0", "P1"]).unwrap();
        let twice = second.apply(&once);
        assert_eq!(twice, "FACT CIE BT P2 ABJ");
        assert_eq!(second.apply(&twice), twice);
    }

    #[test]
    fn known_tags_match_whole_words() {
        let rule = LabelRule::with_known_tags("CIE BT", BT, "P2", ["P1"]).unwrap();
        assert_eq!(rule.apply("CIE BT P10 ABJ"), "CIE BT P2 P10 ABJ");
        assert_eq!(rule.apply("CIE BT P1 05/2024 ABJ"), "CIE BT P2 ABJ");
    }

    #[test]
    fn anchor_is_literal() {
        let rule = LabelRule::new("CIE.BT", BT, "06/2024").unwrap();
        assert_eq!(rule.apply("CIE BT 05/2024"), "CIE BT 05/2024");
        assert_eq!(rule.apply("CIE.BT 05/2024"), "CIE.BT 06/2024");
    }

    #[test]
    fn bad_shape_is_reported() {
        let err = LabelRule::new("CIE BT", r"(\d{2}", "06/2024").unwrap_err();
        assert!(matches!(err, ReconError::InvalidTagShape { .. }));
    }
}
