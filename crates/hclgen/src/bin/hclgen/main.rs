mod cli;

use hclgen::manifest::Manifest;
use hclgen::naming::{RandomNames, SequentialNames, SharedNames};
use hclgen::provider::ProviderCollection;
use hclgen::schema::SchemaCatalog;
use hclgen::value::Value;
use indexmap::IndexMap;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCLGEN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Render(render_cli) => render(render_cli),
        cli::Command::Inspect(inspect_cli) => inspect(inspect_cli),
        cli::Command::Schemas(schemas_cli) => schemas(schemas_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn render(cli: cli::RenderCommand) -> anyhow::Result<()> {
    let providers = evaluate(&cli.input)?;
    print!("{}", hclgen::hcl_render::to_hcl_string(&providers)?);
    Ok(())
}

pub fn inspect(cli: cli::InspectCommand) -> anyhow::Result<()> {
    let providers = evaluate(&cli.input)?;
    let value = plain(&providers);

    match cli.output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), &value)?,
    };

    Ok(())
}

pub fn schemas(cli: cli::SchemasCommand) -> anyhow::Result<()> {
    let catalog = SchemaCatalog::load_file(&cli.schema)?;
    let mut providers = ProviderCollection::new(SequentialNames::shared());
    let provider = providers.add(&catalog, &cli.provider, None, None)?;

    let registry = if cli.data {
        provider.data()
    } else {
        provider.resources()
    };

    for short_name in registry.short_names() {
        println!("{short_name}");
    }

    Ok(())
}

fn evaluate(input: &cli::InputArgs) -> anyhow::Result<ProviderCollection> {
    let catalog = SchemaCatalog::load_file(&input.schema)?;

    let text = match &input.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    let manifest: Manifest = text.parse()?;

    let names: SharedNames = match input.names {
        cli::NameStyle::Sequential => SequentialNames::shared(),
        cli::NameStyle::Random => RandomNames::shared(),
    };

    Ok(manifest.evaluate(&catalog, names)?)
}

/// Address -> assigned values, provider configuration included when set
fn plain(providers: &ProviderCollection) -> Value {
    let mut entries = IndexMap::new();

    for provider in providers.iter() {
        let config = provider.config();
        if config.fields().next().is_some() {
            let key = match provider.alias() {
                Some(alias) => format!("provider.{}.{alias}", provider.type_name()),
                None => format!("provider.{}", provider.type_name()),
            };
            entries.insert(key, config.to_plain_mapping());
        }

        let collections = provider
            .data()
            .collections()
            .chain(provider.resources().collections());
        for collection in collections {
            for resource in collection {
                entries.insert(resource.address().to_string(), resource.to_plain_mapping());
            }
        }
    }

    Value::Object(entries)
}
