use serde_json::json;

use crate::cli::OutputFormat;
use crate::endpoints;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let table = endpoints::registry().load()?;

    match output_format {
        OutputFormat::Json => {
            let routes: Vec<_> = table
                .routes()
                .iter()
                .map(|route| {
                    json!({
                        "name": route.name,
                        "method": route.config.http_method,
                        "path": route.config.path,
                        "authLevel": route.config.auth_level,
                        "weight": route.config.weight,
                        "deprecated": route.config.deprecated,
                        "steps": route.steps.iter().map(|s| format!("{:?}", s)).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&routes)?);
        }
        OutputFormat::Text => {
            for route in table.routes() {
                let steps: Vec<String> = route.steps.iter().map(|s| format!("{:?}", s)).collect();
                println!(
                    "{:<7} {:<32} {:<11} {}",
                    route.config.http_method.as_str(),
                    route.config.path,
                    route.config.auth_level.as_str(),
                    steps.join(" → ")
                );
            }
        }
    }
    Ok(())
}
