use super::{json_pretty, load_manifest, EXIT_SUCCESS};
use console::Style;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Listing<'a> {
    manifest: &'a str,
    extras: Vec<String>,
    envs: Vec<String>,
}

pub fn run(manifest_path: &Path, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let listing = Listing {
        manifest: manifest.origin(),
        extras: manifest.group_names(),
        envs: manifest.tool().env_names(),
    };
    if json {
        println!("{}", json_pretty(&listing)?);
        return Ok(EXIT_SUCCESS);
    }
    let heading = Style::new().bold();
    println!("{}", heading.apply_to("extras:"));
    for extra in &listing.extras {
        println!("  {extra}");
    }
    if !listing.envs.is_empty() {
        println!("{}", heading.apply_to("envs:"));
        for env in &listing.envs {
            println!("  {env}");
        }
    }
    Ok(EXIT_SUCCESS)
}
