use crate::models::ExtractedFields;

/// Completeness score: round(100 × filled / expected) over the six-field
/// extraction schema.
///
/// `None` input means extraction never produced data (all models failed) and
/// scores `None` — deliberately distinct from an extraction that ran but
/// filled zero fields, which scores 0.
pub fn completeness_score(fields: Option<&ExtractedFields>) -> Option<u8> {
    let fields = fields?;
    let filled = filled_count(fields);
    let score = (100.0 * filled as f64 / ExtractedFields::EXPECTED as f64).round();
    Some(score as u8)
}

/// Count the populated fields in a fixed order matching the schema.
pub fn filled_count(fields: &ExtractedFields) -> usize {
    [
        fields.supplier_name.is_some(),
        fields.transaction_date.is_some(),
        fields.total_amount.is_some(),
        fields.cane_type.is_some(),
        fields.weight_kg.is_some(),
        fields.price_per_kg.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count()
}
