use schemars::schema_for;
use schemata_core::MetaDataGraph;

fn main() {
    let schema = schema_for!(MetaDataGraph);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
