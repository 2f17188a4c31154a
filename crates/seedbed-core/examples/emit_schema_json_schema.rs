use schemars::schema_for;
use seedbed_core::Report;

fn main() {
    let schema = schema_for!(Report);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
