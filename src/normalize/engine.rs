use tracing::debug;

use super::aliases::{AliasIndex, AliasScope};
use super::coerce::coerce;
use super::types::{NormalizedRecord, RawRecord};
use crate::catalog::CategoryCatalog;
use crate::TARGET_NORMALIZE;

/// Map a raw record onto the canonical schema of `category`.
///
/// The output always holds exactly the schema's fields. Raw labels that resolve to nothing,
/// or to a field outside the schema, are dropped. Raw keys are visited in sorted order, so
/// when two labels alias the same field the later key wins. A value that coerces to absent
/// does not erase one already set.
pub fn normalize(
    raw: &RawRecord,
    category: &str,
    catalog: &CategoryCatalog,
    index: &AliasIndex,
) -> NormalizedRecord {
    let Some(schema) = catalog.schema(category) else {
        debug!(
            target: TARGET_NORMALIZE,
            "Category '{}' has no schema; {} raw pairs ignored", category, raw.len()
        );
        return NormalizedRecord::default();
    };

    let mut record = NormalizedRecord::empty_for(schema);
    if schema.is_empty() {
        return record;
    }

    for (raw_key, raw_value) in raw.iter() {
        let Some((canonical, scope)) = index.resolve(category, raw_key) else {
            debug!(target: TARGET_NORMALIZE, "Dropping unrecognized label '{}'", raw_key);
            continue;
        };

        let Some(spec) = schema.field(canonical) else {
            debug!(
                target: TARGET_NORMALIZE,
                "Label '{}' resolves to '{}', which is not a '{}' field",
                raw_key, canonical, category
            );
            continue;
        };

        if scope == AliasScope::Global {
            debug!(
                target: TARGET_NORMALIZE,
                "Label '{}' resolved to '{}' through the global fallback", raw_key, canonical
            );
        }

        match coerce(raw_value, spec) {
            Some(value) => {
                record.set(canonical, value);
            }
            None => debug!(
                target: TARGET_NORMALIZE,
                "No usable value for '{}' in '{}'", canonical, raw_value
            ),
        }
    }

    record
}
