//! Outline validation rejects any missing required field.

use proptest::prelude::*;
use quill::validation::{is_valid_outline, parse_outline};
use serde_json::{json, Value};

const REQUIRED: [&str; 5] = ["title", "headings", "slug", "seoTitle", "seoDescription"];

fn outline(title: &str, heading: &str) -> Value {
    json!({
        "title": title,
        "slug": "a-slug",
        "seoTitle": "SEO",
        "seoDescription": "Description",
        "headings": [{ "title": heading, "children": [{ "title": "child" }] }]
    })
}

proptest! {
    #[test]
    fn outline_missing_any_required_field_is_invalid(
        title in "[A-Za-z ]{1,20}",
        heading in "[A-Za-z ]{1,20}",
        missing in 0..REQUIRED.len(),
    ) {
        let complete = outline(&title, &heading);
        prop_assert!(is_valid_outline(&complete));
        prop_assert!(parse_outline(complete.clone()).is_ok());

        let mut broken = complete;
        broken.as_object_mut().unwrap().remove(REQUIRED[missing]);
        prop_assert!(!is_valid_outline(&broken));
    }
}
