use crate::docs::build_document;
use crate::endpoints;

pub fn handle(yaml: bool) -> anyhow::Result<()> {
    let table = endpoints::registry().load()?;
    let document = build_document(&table);

    if yaml {
        print!("{}", serde_yaml::to_string(&document)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }
    Ok(())
}
