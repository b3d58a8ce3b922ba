/// Quickstart example - flatten a record into rows and rebuild it
use metaflat::{Flattener, MetadataNode, Unflattener};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    println!("=== Metaflat Quick Start ===\n");

    // Step 1: Describe the records
    let model = MetadataNode::from_value(&json!({
        "FieldGroupJsonPathKey": "$",
        "FieldGroupName": "User",
        "GroupFields": [{
            "ID": {
                "FieldGroupJsonPathKey": "$.GroupFields[*].ID",
                "FieldGroupName": "ID",
                "FieldGroupIsPrimaryKey": true
            },
            "Username": {
                "FieldGroupJsonPathKey": "$.GroupFields[*].Username",
                "FieldGroupName": "Username"
            },
            "Posts": {
                "FieldGroupJsonPathKey": "$.GroupFields[*].Posts",
                "FieldGroupName": "Posts",
                "GroupFields": [{
                    "ID": {
                        "FieldGroupJsonPathKey": "$.GroupFields[*].Posts.GroupFields[*].ID",
                        "FieldGroupName": "Post ID",
                        "FieldGroupIsPrimaryKey": true
                    },
                    "Title": {
                        "FieldGroupJsonPathKey": "$.GroupFields[*].Posts.GroupFields[*].Title",
                        "FieldGroupName": "Title"
                    }
                }],
                "GroupReadOrderOfFields": ["ID", "Title"]
            }
        }],
        "GroupReadOrderOfFields": ["ID", "Username", "Posts"]
    }))?;

    // Step 2: Your JSON data
    let my_data = json!({
        "ID": [1],
        "Username": ["alice"],
        "Posts": [
            {"ID": [100], "Title": ["My First Post"]},
            {"ID": [101], "Title": ["Second Post"]}
        ]
    });

    println!("Original JSON:");
    println!("{}\n", serde_json::to_string_pretty(&my_data)?);

    // Step 3: Flatten, one row per post
    let mut flattener = Flattener::new(&model)?;
    flattener.flatten(&my_data)?;

    println!("Columns: {:?}", flattener.columns().headers());
    let rows: Vec<_> = flattener.written_rows().collect();
    for row in &rows {
        println!("  {}", serde_json::to_string(row)?);
    }

    // Step 4: Rebuild the record from the rows
    let mut unflattener = Unflattener::new(&model)?;
    unflattener.unflatten(&rows)?;
    let records = unflattener.into_destination();

    println!("\nRebuilt JSON:");
    println!("{}", serde_json::to_string_pretty(&records)?);

    println!("\n✓ Round trip matches: {}", records == json!([my_data]));
    Ok(())
}
