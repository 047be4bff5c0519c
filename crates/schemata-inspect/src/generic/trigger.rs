use schemata_core::{ObjectType, Result, TriggerEvent, TriggerTiming};

use crate::connection::{Row, labels};
use crate::context::InspectionContext;
use crate::inspector::{InspectionQuery, Query, Source};
use crate::scope::InspectionScope;

use super::{TABLE, column_from_row, is_excluded, required, table_from_row};

const TRIGGERS: &str = "SELECT event_object_catalog AS TABLE_CAT, \
     event_object_schema AS TABLE_SCHEM, \
     event_object_table AS TABLE_NAME, \
     trigger_name AS TRIGGER_NAME, \
     event_manipulation AS TRIGGER_EVENT, \
     action_timing AS TRIGGER_TIMING, \
     action_orientation AS TRIGGER_LEVEL, \
     action_statement AS TRIGGER_BODY \
     FROM information_schema.triggers WHERE 1 = 1";

/// Table triggers from `information_schema.triggers`.
#[derive(Debug, Clone, Default)]
pub struct TriggerQuery;

impl InspectionQuery for TriggerQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Trigger
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            TRIGGERS,
            &[
                ("event_object_catalog", scope.catalog.as_deref()),
                ("event_object_schema", scope.schema.as_deref()),
                ("event_object_table", scope.table.as_deref()),
            ],
            "ORDER BY event_object_schema, event_object_table, trigger_name",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_trigger(context, row)
    }
}

/// Merge a trigger row. With a `COLUMN_NAME` value the trigger becomes a
/// column trigger. Several rows for one trigger accumulate their events.
pub fn merge_trigger(context: &mut InspectionContext<'_>, row: &Row) -> Result<()> {
    if is_excluded(context, row, TABLE) {
        return Ok(());
    }
    let name = context.identifier(&required(row, labels::TRIGGER_NAME)?);
    let table = table_from_row(context, row, TABLE, true)?;
    let trigger = match row.string(labels::COLUMN_NAME) {
        Some(_) => {
            let column = column_from_row(context, table, row, labels::COLUMN_NAME)?;
            context.results_mut().add_column_trigger(table, column, name)
        }
        None => context.results_mut().add_trigger(table, name),
    };

    let Some(node) = context.results_mut().graph_mut().trigger_mut(trigger) else {
        return Ok(());
    };
    if let Some(timing) = row.string(labels::TRIGGER_TIMING) {
        node.timing = TriggerTiming::parse(&timing).or(node.timing);
    }
    if let Some(events) = row.string(labels::TRIGGER_EVENT) {
        for event in TriggerEvent::parse_all(&events) {
            if !node.events.contains(&event) {
                node.events.push(event);
            }
        }
    }
    if let Some(level) = row.string(labels::TRIGGER_LEVEL) {
        node.for_each_row = !level.trim().eq_ignore_ascii_case("STATEMENT");
    }
    if let Some(body) = row.string(labels::TRIGGER_BODY) {
        node.body = Some(body);
    }
    if let Some(active) = row.boolean(labels::ACTIVE) {
        node.active = active;
    }
    Ok(())
}
