use schemata_core::{ObjectType, Result, UserDefinedTypeKind, type_codes};

use crate::connection::{MetaDataRequest, Row, labels};
use crate::context::InspectionContext;
use crate::inspector::{InspectionQuery, Source};
use crate::scope::InspectionScope;

use super::{required, schema_from_row};

/// User-defined types through the driver's type listing.
///
/// Product queries may add `TYPE_KIND` (`enum`, `domain`, `composite`),
/// comma-separated `TYPE_VALUES` and a `DEFINITION`.
#[derive(Debug, Clone, Default)]
pub struct UserDefinedTypeQuery;

impl InspectionQuery for UserDefinedTypeQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::UserDefinedType
    }

    fn source(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::MetaData(MetaDataRequest::UserDefinedTypes {
            catalog: scope.catalog.clone(),
            schema: scope.schema.clone(),
            type_name: None,
        })
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_user_defined_type(context, row)
    }
}

/// Merge a type row labelled `TYPE_CAT`, `TYPE_SCHEM`, `TYPE_NAME` and the
/// optional kind, base type, values and definition.
pub fn merge_user_defined_type(context: &mut InspectionContext<'_>, row: &Row) -> Result<()> {
    if context.is_excluded_schema(row.string(labels::TYPE_CAT).as_deref())
        || context.is_excluded_schema(row.string(labels::TYPE_SCHEM).as_deref())
    {
        return Ok(());
    }
    let name = context.identifier(&required(row, labels::TYPE_NAME)?);
    let type_code = row
        .int(labels::DATA_TYPE)
        .and_then(|code| i32::try_from(code).ok());
    let schema = schema_from_row(context, row, labels::TYPE_CAT, labels::TYPE_SCHEM);
    let results = context.results_mut();
    let id = results.add_user_defined_type(schema, name);
    let Some(node) = results.graph_mut().user_defined_type_mut(id) else {
        return Ok(());
    };

    node.type_code = type_code;
    node.kind = match (row.string(labels::TYPE_KIND), type_code) {
        (Some(kind), _) => kind_from_name(&kind),
        (None, Some(type_codes::STRUCT)) => UserDefinedTypeKind::Composite,
        (None, Some(type_codes::DISTINCT)) => UserDefinedTypeKind::Distinct,
        (None, Some(code)) => UserDefinedTypeKind::Other(code.to_string()),
        (None, None) => UserDefinedTypeKind::default(),
    };
    node.base_type = row.string(labels::BASE_TYPE);
    if let Some(values) = row.string(labels::TYPE_VALUES) {
        node.values = values.split(',').map(|value| value.trim().to_string()).collect();
    }
    node.definition = row.string(labels::DEFINITION).or(row.string(labels::REMARKS));
    Ok(())
}

fn kind_from_name(kind: &str) -> UserDefinedTypeKind {
    match kind.trim().to_lowercase().as_str() {
        "enum" => UserDefinedTypeKind::Enum,
        "domain" => UserDefinedTypeKind::Domain,
        "composite" | "struct" => UserDefinedTypeKind::Composite,
        "distinct" | "alias" => UserDefinedTypeKind::Distinct,
        other => UserDefinedTypeKind::Other(other.to_string()),
    }
}
