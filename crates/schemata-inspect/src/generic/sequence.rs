use schemata_core::{ObjectType, Result, Sequence};

use crate::connection::{Row, labels};
use crate::context::InspectionContext;
use crate::inspector::{InspectionQuery, Query, Source};
use crate::scope::InspectionScope;

use super::{required, schema_from_row};

const SEQUENCES: &str = "SELECT sequence_catalog AS SEQUENCE_CAT, \
     sequence_schema AS SEQUENCE_SCHEM, \
     sequence_name AS SEQUENCE_NAME, \
     start_value AS START_WITH, \
     minimum_value AS MIN_VALUE, \
     maximum_value AS MAX_VALUE, \
     increment AS INCREMENT_BY, \
     cycle_option AS CYCLE \
     FROM information_schema.sequences WHERE 1 = 1";

/// Sequences from `information_schema.sequences`.
#[derive(Debug, Clone, Default)]
pub struct SequenceQuery;

impl InspectionQuery for SequenceQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Sequence
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            SEQUENCES,
            &[
                ("sequence_catalog", scope.catalog.as_deref()),
                ("sequence_schema", scope.schema.as_deref()),
            ],
            "ORDER BY sequence_schema, sequence_name",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_sequence(context, row)
    }
}

/// Merge a standalone sequence row labelled `SEQUENCE_CAT`,
/// `SEQUENCE_SCHEM`, `SEQUENCE_NAME` and the generator settings.
pub fn merge_sequence(context: &mut InspectionContext<'_>, row: &Row) -> Result<()> {
    if context.is_excluded_schema(row.string(labels::SEQUENCE_CAT).as_deref())
        || context.is_excluded_schema(row.string(labels::SEQUENCE_SCHEM).as_deref())
    {
        return Ok(());
    }
    let name = context.identifier(&required(row, labels::SEQUENCE_NAME)?);
    let schema = schema_from_row(context, row, labels::SEQUENCE_CAT, labels::SEQUENCE_SCHEM);
    let results = context.results_mut();
    let sequence = results.add_sequence(schema, name);
    if let Some(node) = results.graph_mut().sequence_mut(sequence) {
        apply_settings(node, row);
    }
    Ok(())
}

/// Copy generator settings present in `row` onto `sequence`.
pub(crate) fn apply_settings(sequence: &mut Sequence, row: &Row) {
    let settings = [
        (labels::START_WITH, &mut sequence.start_with),
        (labels::INCREMENT_BY, &mut sequence.increment_by),
        (labels::MIN_VALUE, &mut sequence.min_value),
        (labels::MAX_VALUE, &mut sequence.max_value),
        (labels::LAST_VALUE, &mut sequence.last_value),
    ];
    for (label, slot) in settings {
        if let Some(value) = row.int128(label) {
            *slot = Some(value);
        }
    }
    if let Some(cycle) = row.boolean(labels::CYCLE) {
        sequence.cycle = cycle;
    }
    if let Some(cache) = row.int(labels::CACHE_SIZE) {
        sequence.cache = Some(cache);
    }
    if let Some(temporary) = row.boolean(labels::TEMPORARY) {
        sequence.temporary = temporary;
    }
}
