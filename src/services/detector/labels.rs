use std::borrow::Cow;

/// Class labels in the detector's output index order.
pub const CATEGORY_LABELS: [&str; 18] = [
    "FEMALE_GENITALIA_COVERED",
    "FACE_FEMALE",
    "BUTTOCKS_EXPOSED",
    "FEMALE_BREAST_EXPOSED",
    "FEMALE_GENITALIA_EXPOSED",
    "MALE_BREAST_EXPOSED",
    "ANUS_EXPOSED",
    "FEET_EXPOSED",
    "BELLY_COVERED",
    "FEET_COVERED",
    "ARMPITS_COVERED",
    "ARMPITS_EXPOSED",
    "FACE_MALE",
    "BELLY_EXPOSED",
    "MALE_GENITALIA_EXPOSED",
    "ANUS_COVERED",
    "FEMALE_BREAST_COVERED",
    "BUTTOCKS_COVERED",
];

pub const NUM_CLASSES: usize = CATEGORY_LABELS.len();

/// Category name for a raw class index. Out-of-range indices map to `UNKNOWN_{index}`.
pub fn category_for_index(index: i64) -> Cow<'static, str> {
    usize::try_from(index)
        .ok()
        .and_then(|i| CATEGORY_LABELS.get(i))
        .map(|label| Cow::Borrowed(*label))
        .unwrap_or_else(|| Cow::Owned(format!("UNKNOWN_{}", index)))
}

/// `BUTTOCKS_EXPOSED` -> `Buttocks Exposed`.
pub fn display_name(category: &str) -> String {
    category
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
