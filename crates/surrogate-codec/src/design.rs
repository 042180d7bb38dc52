//! Textual payloads for design vectors.
//!
//! A design `[0.5, -2.0]` becomes `"x0: 0.5, x1: -2.0"`. Variable names are
//! positional, matching the metadata lines from [`describe_bounds`].

use crate::pipeline::RawItem;

pub fn serialize_design(values: &[f64]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("x{i}: {v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Appends free-form task metadata: `"{text}. {metadata}"`.
pub fn with_metadata(text: &str, metadata: &str) -> String {
    format!("{text}. {metadata}")
}

/// One `"x{i}:DOUBLE, [lo, hi]"` line per continuous variable.
pub fn describe_bounds(bounds: &[(f64, f64)]) -> Vec<String> {
    bounds
        .iter()
        .enumerate()
        .map(|(i, (lo, hi))| format!("x{i}:DOUBLE, [{lo:?}, {hi:?}]"))
        .collect()
}

/// Payload item for a design, optionally followed by its metadata.
pub fn design_item(values: &[f64], metadata: Option<&str>) -> RawItem {
    let text = serialize_design(values);
    match metadata {
        Some(meta) => RawItem::from(with_metadata(&text, meta)),
        None => RawItem::from(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_text() {
        assert_eq!(serialize_design(&[0.5, -2.0, 3.25]), "x0: 0.5, x1: -2.0, x2: 3.25");
        assert_eq!(serialize_design(&[]), "");
        assert_eq!(serialize_design(&[1e-7]), "x0: 1e-7");
    }

    #[test]
    fn metadata_suffix() {
        assert_eq!(with_metadata("x0: 1.0", "task: ant"), "x0: 1.0. task: ant");
    }

    #[test]
    fn bounds_lines() {
        assert_eq!(
            describe_bounds(&[(-1.0, 1.0), (0.0, 10.5)]),
            vec!["x0:DOUBLE, [-1.0, 1.0]", "x1:DOUBLE, [0.0, 10.5]"]
        );
    }

    #[test]
    fn design_item_is_payload() {
        assert_eq!(
            design_item(&[2.0], Some("m")),
            RawItem::Payload(b"x0: 2.0. m".to_vec())
        );
        assert_eq!(design_item(&[], None), RawItem::Payload(Vec::new()));
    }
}
