use serde::Deserialize;
use strata_props::{system_properties, MapSource, Properties, HIGHEST_PRIORITY};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
enum Mode {
    Development,
    Production,
}

fn main() -> Result<(), strata_props::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    system_properties::set("app.mode", "Development");

    // defaults -> optional local file -> environment -> system properties -> forced overrides
    let props = Properties::builder()
        .add(
            MapSource::new()
                .with("app.name", "demo")
                .with("db.host", "localhost")
                .with("db.port", "5432")
                .with("db.url", "postgres://${db.host}:${db.port}/${app.name}")
                .with("features", "search,export"),
        )
        .add_optional_location("file:demos/local.properties")
        .add_with_priority(MapSource::new().with("db.port", "6432"), HIGHEST_PRIORITY)
        .build()?;

    let mode = props.get_enum_or("app.mode", Mode::Production)?;
    println!("mode: {mode:?}");
    println!("database: {}", props.get_or("db.url", "<unset>"));
    println!("features: {:?}", props.get_list("features"));
    println!("home: {}", props.get_or("home", "<unset>"));

    Ok(())
}
